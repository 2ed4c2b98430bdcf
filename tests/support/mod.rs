#![allow(dead_code)]

use std::marker::PhantomData;

use strided_separable::{
    copy_buffer, Image, Result, Sample, SeparableLineFilter, SeparableLineFilterParams,
    TensorLookup,
};

/// Copies each input line to the output unchanged.
pub struct CopyLine<T>(PhantomData<T>);

impl<T: Sample> CopyLine<T> {
    pub fn new() -> Self {
        CopyLine(PhantomData)
    }
}

impl<T: Sample> SeparableLineFilter for CopyLine<T> {
    fn filter(&mut self, params: SeparableLineFilterParams<'_>) -> Result<()> {
        let n = params.in_buffer.length().min(params.out_buffer.length()) as isize;
        for t in 0..params.out_buffer.tensor_length() {
            for i in 0..n {
                let v: T = params.in_buffer.get(i, t);
                params.out_buffer.set(i, t, v);
            }
        }
        Ok(())
    }
}

/// Copies each line whatever the buffer type, through the raw line layout.
pub struct RawCopy;

impl SeparableLineFilter for RawCopy {
    fn filter(&mut self, params: SeparableLineFilterParams<'_>) -> Result<()> {
        let n = params.in_buffer.length().min(params.out_buffer.length());
        // SAFETY: both buffers cover `0..length` pixels of `tensor_length` samples.
        unsafe {
            copy_buffer(
                params.in_buffer.raw().as_const(),
                params.out_buffer.raw(),
                n,
                params.out_buffer.tensor_length(),
                &TensorLookup::Identity,
            )
        };
        Ok(())
    }
}

/// Nearest-neighbour resampling of each line to the output length.
pub struct Resample;

impl SeparableLineFilter for Resample {
    fn filter(&mut self, params: SeparableLineFilterParams<'_>) -> Result<()> {
        let n_in = params.in_buffer.length();
        let n_out = params.out_buffer.length();
        for t in 0..params.out_buffer.tensor_length() {
            for i in 0..n_out {
                let src = (i * n_in / n_out) as isize;
                let v: f64 = params.in_buffer.get(src, t);
                params.out_buffer.set(i as isize, t, v);
            }
        }
        Ok(())
    }
}

/// Moving average over `size` pixels (odd), reading from the line margins.
pub struct Uniform {
    pub size: usize,
}

impl SeparableLineFilter for Uniform {
    fn filter(&mut self, params: SeparableLineFilterParams<'_>) -> Result<()> {
        let half = (self.size / 2) as isize;
        let n = params.in_buffer.length() as isize;
        for t in 0..params.in_buffer.tensor_length() {
            for i in 0..n {
                let sum: f64 = (-half..=half)
                    .map(|k| params.in_buffer.get::<f64>(i + k, t))
                    .sum();
                params.out_buffer.set(i, t, sum / self.size as f64);
            }
        }
        Ok(())
    }
}

/// 3-tap average that clamps indices itself and needs no margin.
pub struct ClampedAverage;

impl SeparableLineFilter for ClampedAverage {
    fn filter(&mut self, params: SeparableLineFilterParams<'_>) -> Result<()> {
        let n = params.in_buffer.length() as isize;
        for i in 0..n {
            let sum: f64 = (i - 1..=i + 1)
                .map(|k| params.in_buffer.get::<f64>(k.clamp(0, n - 1), 0))
                .sum();
            params.out_buffer.set(i, 0, sum / 3.0);
        }
        Ok(())
    }
}

/// One call of a line filter, as observed by [`Recorder`].
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub dimension: usize,
    pub position: Vec<usize>,
    pub in_length: usize,
    pub out_length: usize,
    pub in_stride: isize,
    pub in_border: usize,
    pub out_border: usize,
    pub tensor_length: usize,
}

/// Records every call and then resamples the line like [`Resample`].
#[derive(Default)]
pub struct Recorder {
    pub threads: Option<usize>,
    pub calls: Vec<Call>,
}

impl Recorder {
    /// Processed dimensions in the order the passes ran.
    pub fn pass_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = Vec::new();
        for call in &self.calls {
            if order.last() != Some(&call.dimension) {
                order.push(call.dimension);
            }
        }
        order
    }
}

impl SeparableLineFilter for Recorder {
    fn set_number_of_threads(&mut self, threads: usize) {
        self.threads = Some(threads);
    }

    fn filter(&mut self, params: SeparableLineFilterParams<'_>) -> Result<()> {
        self.calls.push(Call {
            dimension: params.dimension,
            position: params.position.to_vec(),
            in_length: params.in_buffer.length(),
            out_length: params.out_buffer.length(),
            in_stride: params.in_buffer.stride(),
            in_border: params.in_buffer.border(),
            out_border: params.out_buffer.border(),
            tensor_length: params.in_buffer.tensor_length(),
        });
        Resample.filter(params)
    }
}

/// Image of the given sizes holding `0, 1, 2, ...` in coordinate order.
pub fn ramp<T: Sample>(sizes: &[usize], convert: impl Fn(usize) -> T) -> Image {
    let n: usize = sizes.iter().product();
    let data: Vec<T> = (0..n).map(convert).collect();
    Image::from_samples(&data, sizes, 1).unwrap()
}

/// Reference 2D moving average with nearest-pixel extension, dim 0 fastest.
pub fn naive_uniform_2d(data: &[f64], sizes: [usize; 2], size: usize) -> Vec<f64> {
    let half = (size / 2) as isize;
    let [nx, ny] = sizes;
    let at = |x: isize, y: isize| {
        let x = x.clamp(0, nx as isize - 1) as usize;
        let y = y.clamp(0, ny as isize - 1) as usize;
        data[y * nx + x]
    };
    let mut tmp = vec![0.0; nx * ny];
    for y in 0..ny as isize {
        for x in 0..nx as isize {
            let sum: f64 = (-half..=half).map(|k| at(x + k, y)).sum();
            tmp[y as usize * nx + x as usize] = sum / size as f64;
        }
    }
    let at_tmp = |x: isize, y: isize| {
        let x = x.clamp(0, nx as isize - 1) as usize;
        let y = y.clamp(0, ny as isize - 1) as usize;
        tmp[y * nx + x]
    };
    let mut out = vec![0.0; nx * ny];
    for y in 0..ny as isize {
        for x in 0..nx as isize {
            let sum: f64 = (-half..=half).map(|k| at_tmp(x, y + k)).sum();
            out[y as usize * nx + x as usize] = sum / size as f64;
        }
    }
    out
}
