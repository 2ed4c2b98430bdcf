//! The per-line callback invoked by the separable driver.

use crate::buffer::LineBuffer;
use crate::Result;

/// Everything a line filter gets for one line.
#[derive(Debug)]
pub struct SeparableLineFilterParams<'a> {
    /// Input line, possibly with margins filled in.
    pub in_buffer: &'a LineBuffer,
    /// Output line, to be filled over `0..length`.
    pub out_buffer: &'a mut LineBuffer,
    /// Dimension being processed.
    pub dimension: usize,
    /// Coordinates of the first pixel of the line (0 along `dimension`).
    pub position: &'a [usize],
    /// Index of the calling thread, always below the announced thread count.
    pub thread: usize,
}

/// A 1D filter applied to every line along each processed dimension.
///
/// Closures `FnMut(SeparableLineFilterParams<'_>) -> Result<()>` implement
/// this trait directly.
pub trait SeparableLineFilter {
    /// Called once before the first pass with the number of threads that
    /// will call [`filter`](Self::filter); per-thread state can be sized here.
    fn set_number_of_threads(&mut self, _threads: usize) {}

    /// Process one line. An error aborts the whole operation.
    fn filter(&mut self, params: SeparableLineFilterParams<'_>) -> Result<()>;
}

impl<F> SeparableLineFilter for F
where
    F: FnMut(SeparableLineFilterParams<'_>) -> Result<()>,
{
    fn filter(&mut self, params: SeparableLineFilterParams<'_>) -> Result<()> {
        self(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferStorage;
    use crate::SeparableError;
    use strided_image::DataType;

    struct Doubler {
        threads: usize,
    }

    impl SeparableLineFilter for Doubler {
        fn set_number_of_threads(&mut self, threads: usize) {
            self.threads = threads;
        }

        fn filter(&mut self, params: SeparableLineFilterParams<'_>) -> Result<()> {
            for i in 0..params.in_buffer.length() as isize {
                let v: f64 = params.in_buffer.get(i, 0);
                params.out_buffer.set(i, 0, 2.0 * v);
            }
            Ok(())
        }
    }

    fn line_pair() -> (BufferStorage, BufferStorage) {
        (BufferStorage::default(), BufferStorage::default())
    }

    #[test]
    fn test_struct_filter() {
        let (mut a, mut b) = line_pair();
        let mut input = LineBuffer::staged(&mut a, DataType::DFloat, 3, 0, 1, false);
        let mut output = LineBuffer::staged(&mut b, DataType::DFloat, 3, 0, 1, false);
        for i in 0..3 {
            input.set::<f64>(i, 0, i as f64);
        }
        let mut f = Doubler { threads: 0 };
        f.set_number_of_threads(1);
        assert_eq!(f.threads, 1);
        f.filter(SeparableLineFilterParams {
            in_buffer: &input,
            out_buffer: &mut output,
            dimension: 0,
            position: &[0],
            thread: 0,
        })
        .unwrap();
        assert_eq!(output.to_vec::<f64>(0), vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_closure_filter_error() {
        let (mut a, mut b) = line_pair();
        let input = LineBuffer::staged(&mut a, DataType::SFloat, 2, 0, 1, false);
        let mut output = LineBuffer::staged(&mut b, DataType::SFloat, 2, 0, 1, false);
        let mut calls = 0;
        let mut f = |params: SeparableLineFilterParams<'_>| -> Result<()> {
            calls += 1;
            Err(SeparableError::LineFilter(format!("dim {}", params.dimension)))
        };
        let err = f
            .filter(SeparableLineFilterParams {
                in_buffer: &input,
                out_buffer: &mut output,
                dimension: 1,
                position: &[0, 0],
                thread: 0,
            })
            .unwrap_err();
        assert!(matches!(err, SeparableError::LineFilter(msg) if msg == "dim 1"));
        assert_eq!(calls, 1);
    }
}
