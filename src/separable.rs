//! The separable driver: one 1D line filter applied along several dimensions.
//!
//! Each processed dimension is one pass. A pass walks every line along its
//! dimension, stages the line into a scratch buffer when needed (type
//! conversion, tensor remapping, margins, or aliasing), calls the line
//! filter, and copies the result back when the output was staged.

use log::{debug, trace};
use strided_image::{AcceptDataTypeChange, DataType, Image, Tensor, TensorLookup};

use crate::boundary::{expand_buffer, BoundaryCondition};
use crate::buffer::{
    input_needs_buffer, output_needs_buffer, resolve_aliasing, BufferStorage, LineBuffer, Staging,
};
use crate::copy::{copy_buffer, copy_image, RawLine};
use crate::filter::{SeparableLineFilter, SeparableLineFilterParams};
use crate::iter::LineIterator;
use crate::order::{compute_order, growth_ratios};
use crate::shape::split_evenly;
use crate::{Result, SeparableError, SeparableOption, SeparableOptions};

/// Lines are processed by the calling thread only.
const NUMBER_OF_THREADS: usize = 1;

/// Apply `line_filter` along every dimension selected by `process`.
///
/// * `buffer_type`: sample type the filter reads and writes.
/// * `output_type`: sample type of `output` (a protected `output` keeps its own).
/// * `process`: dimensions to filter; empty means all.
/// * `border`: margin of the input line buffer per dimension.
/// * `boundary_conditions`: how margins are filled per dimension.
///
/// `border` and `boundary_conditions` may be empty (defaults), hold one
/// value (used for all dimensions) or one value per dimension.
///
/// Unless [`SeparableOption::DontResizeOutput`] is given, `output` is
/// reforged to the input sizes. When nothing is processed, `output`
/// becomes a view of `input`.
#[allow(clippy::too_many_arguments)]
pub fn separable(
    input: &Image,
    output: &mut Image,
    buffer_type: DataType,
    output_type: DataType,
    process: &[bool],
    border: &[usize],
    boundary_conditions: &[BoundaryCondition],
    line_filter: &mut dyn SeparableLineFilter,
    options: SeparableOptions,
) -> Result<()> {
    if !input.is_forged() {
        return Err(SeparableError::NotAllocated);
    }
    let n_dims = input.dimensionality();

    // Validate per-dimension parameters
    let mut process = if process.is_empty() {
        vec![true; n_dims]
    } else if process.len() != n_dims {
        return Err(SeparableError::ArrayLengthMismatch {
            expected: n_dims,
            found: process.len(),
        });
    } else {
        process.to_vec()
    };
    if !process.iter().any(|&p| p) {
        debug!("separable: no dimension to process, output set to input");
        return assign_input(input, output);
    }
    let mut border = per_dimension(border, n_dims, 0)?;
    let mut boundary = per_dimension(boundary_conditions, n_dims, BoundaryCondition::default())?;

    let out_sizes = if options.contains(SeparableOption::DontResizeOutput) {
        let sizes = output.sizes().to_vec();
        if sizes.len() != n_dims {
            return Err(SeparableError::DimensionMismatch {
                dim: None,
                input: n_dims,
                output: sizes.len(),
            });
        }
        if let Some(d) = (0..n_dims).find(|&d| !process[d] && sizes[d] != input.size(d)) {
            return Err(SeparableError::DimensionMismatch {
                dim: Some(d),
                input: input.size(d),
                output: sizes[d],
            });
        }
        sizes
    } else {
        input.sizes().to_vec()
    };

    // Prepare the input view and the output tensor
    let pixel_size = input.pixel_size().clone();
    let mut color_space = input.color_space().to_string();
    let mut in_view = input.quick_copy();
    let mut out_tensor = *input.tensor();
    let mut lookup = TensorLookup::Identity;
    let mut folded = false;
    if options.contains(SeparableOption::AsScalarImage) {
        if !in_view.is_scalar() {
            in_view.tensor_to_spatial(0)?;
            process.insert(0, false);
            border.insert(0, 0);
            boundary.insert(0, BoundaryCondition::default());
            folded = true;
        }
    } else if options.contains(SeparableOption::ExpandTensorInBuffer)
        && !input.tensor().has_normal_order()
    {
        lookup = TensorLookup::expanding(input.tensor());
        out_tensor = Tensor::matrix(input.tensor().rows(), input.tensor().columns());
        color_space.clear();
    }

    // Reforge the output, never writing into memory the input still needs
    if output.is_forged() && output.is_overlapping_view(input) {
        output.strip()?;
    }
    output.reforge(
        &out_sizes,
        out_tensor.elements(),
        output_type,
        AcceptDataTypeChange::DoAllow,
    )?;
    output.reshape_tensor(out_tensor)?;
    let mut out_view = output.quick_copy();
    if folded {
        out_view.tensor_to_spatial(0)?;
    }

    let grow = growth_ratios(in_view.sizes(), out_view.sizes());
    let order = compute_order(&process, in_view.strides(), &grow);
    let use_intermediate = out_view.data_type() != buffer_type;
    debug!(
        "separable: {:?} -> {:?}, buffer type {}, output type {}, intermediate {}",
        in_view.sizes(),
        out_view.sizes(),
        buffer_type,
        out_view.data_type(),
        use_intermediate
    );
    trace!("separable: processing order {:?}", order);

    line_filter.set_number_of_threads(NUMBER_OF_THREADS);
    let mut buffers = Buffers::default();
    let mut intermediate: Option<Image> = None;
    let mut current = in_view;
    for (rep, &dim) in order.iter().enumerate() {
        let target = if rep + 1 == order.len() {
            out_view.clone()
        } else {
            let mut sizes = current.sizes().to_vec();
            sizes[dim] = out_view.size(dim);
            pass_target(&sizes, &out_view, buffer_type, use_intermediate, &mut intermediate)?
        };
        let pass = Pass {
            dim,
            buffer_type,
            border: border[dim],
            condition: boundary[dim],
            lookup: &lookup,
            options,
        };
        run_pass(&pass, &current, &target, &mut buffers, line_filter)?;
        current = target;
        // Later passes read full-layout data
        lookup = TensorLookup::Identity;
    }

    output.set_pixel_size(pixel_size);
    output.set_color_space(color_space);
    Ok(())
}

/// Expand a per-dimension parameter to one value per dimension.
fn per_dimension<T: Clone>(values: &[T], n_dims: usize, default: T) -> Result<Vec<T>> {
    match values.len() {
        0 => Ok(vec![default; n_dims]),
        n if n == n_dims => Ok(values.to_vec()),
        1 => Ok(vec![values[0].clone(); n_dims]),
        found => Err(SeparableError::ArrayLengthMismatch {
            expected: n_dims,
            found,
        }),
    }
}

/// Make `output` hold the input unchanged.
fn assign_input(input: &Image, output: &mut Image) -> Result<()> {
    if !output.is_protected() {
        *output = input.clone();
        return Ok(());
    }
    output.reforge(
        input.sizes(),
        input.tensor_elements(),
        input.data_type(),
        AcceptDataTypeChange::DoAllow,
    )?;
    output.reshape_tensor(*input.tensor())?;
    copy_image(input, output)?;
    output.set_pixel_size(input.pixel_size().clone());
    output.set_color_space(input.color_space());
    Ok(())
}

/// Image a non-final pass writes into.
///
/// Without type conversion this is the leading window of the output when
/// the pass result fits in it. Otherwise an intermediate image of the
/// working type is used, reused while its sizes stay the same.
fn pass_target(
    sizes: &[usize],
    out_view: &Image,
    buffer_type: DataType,
    use_intermediate: bool,
    intermediate: &mut Option<Image>,
) -> Result<Image> {
    let fits = sizes.iter().zip(out_view.sizes()).all(|(&s, &o)| s <= o);
    if !use_intermediate && fits {
        return Ok(out_view.window(sizes)?);
    }
    if let Some(img) = intermediate.as_ref().filter(|img| img.sizes() == sizes) {
        return Ok(img.clone());
    }
    let img = Image::new(sizes, out_view.tensor_elements(), buffer_type)?;
    debug!("separable: new intermediate image {:?}", sizes);
    *intermediate = Some(img.clone());
    Ok(img)
}

/// Settings shared by all lines of one pass.
struct Pass<'a> {
    dim: usize,
    buffer_type: DataType,
    border: usize,
    condition: BoundaryCondition,
    lookup: &'a TensorLookup,
    options: SeparableOptions,
}

/// Scratch memory reused by all passes.
#[derive(Default)]
struct Buffers {
    input: BufferStorage,
    output: BufferStorage,
}

fn run_pass(
    pass: &Pass<'_>,
    in_image: &Image,
    out_image: &Image,
    buffers: &mut Buffers,
    line_filter: &mut dyn SeparableLineFilter,
) -> Result<()> {
    let dim = pass.dim;
    let in_length = in_image.size(dim);
    let out_length = out_image.size(dim);
    let out_border = if pass.options.contains(SeparableOption::UseOutputBorder) {
        pass.border
    } else {
        0
    };
    let staging = resolve_aliasing(
        Staging {
            input: input_needs_buffer(
                in_image.data_type(),
                pass.buffer_type,
                pass.lookup,
                pass.border,
                pass.options,
            ),
            output: output_needs_buffer(
                out_image.data_type(),
                pass.buffer_type,
                out_border,
                pass.options,
            ),
        },
        in_image.same_origin(out_image),
    );

    let source = RawLine {
        ptr: in_image.origin()? as *const u8,
        data_type: in_image.data_type(),
        stride: in_image.stride(dim),
        tensor_stride: in_image.tensor_stride(),
    };
    let target = RawLine {
        ptr: out_image.origin()?,
        data_type: out_image.data_type(),
        stride: out_image.stride(dim),
        tensor_stride: out_image.tensor_stride(),
    };

    let mut in_buffer = if staging.input {
        LineBuffer::staged(
            &mut buffers.input,
            pass.buffer_type,
            in_length,
            pass.border,
            pass.lookup.output_elements(in_image.tensor_elements()),
            source.stride == 0,
        )
    } else {
        LineBuffer::direct(
            source.data_type,
            in_length,
            source.stride,
            source.tensor_stride,
            in_image.tensor_elements(),
        )
    };
    let mut out_buffer = if staging.output {
        LineBuffer::staged(
            &mut buffers.output,
            pass.buffer_type,
            out_length,
            out_border,
            out_image.tensor_elements(),
            false,
        )
    } else {
        LineBuffer::direct(
            target.data_type,
            out_length,
            target.stride,
            target.tensor_stride,
            out_image.tensor_elements(),
        )
    };
    debug!(
        "separable pass along dim {}: length {} -> {}, staging {:?}, border {}/{}, buffer bytes {}/{}",
        dim,
        in_length,
        out_length,
        staging,
        in_buffer.border(),
        out_buffer.border(),
        buffers.input.len_bytes(),
        buffers.output.len_bytes()
    );

    let lines = LineIterator::new(in_image, out_image, dim)?;
    let starts = split_evenly(
        in_image.sizes(),
        NUMBER_OF_THREADS,
        lines.line_count(),
        Some(dim),
    );
    let lines = match starts.first() {
        Some(start) => lines.starting_at(start)?,
        None => lines,
    };

    let in_size = source.data_type.size_of() as isize;
    let out_size = target.data_type.size_of() as isize;
    let staged_pixels = if in_buffer.stride() == 0 { 1 } else { in_length };
    for line in lines {
        let in_ptr = source.ptr.wrapping_offset(line.in_offset * in_size);
        let out_ptr = target.ptr.wrapping_offset(line.out_offset * out_size);
        if staging.input {
            // SAFETY: the line lies inside `in_image`, and the staged buffer
            // was reserved for `length + 2 * border` pixels.
            unsafe {
                copy_buffer(
                    RawLine {
                        ptr: in_ptr,
                        ..source
                    },
                    in_buffer.raw(),
                    staged_pixels,
                    in_buffer.tensor_length(),
                    pass.lookup,
                );
                if in_buffer.border() > 0 && in_buffer.stride() != 0 {
                    expand_buffer(
                        in_buffer.raw(),
                        in_length,
                        in_buffer.tensor_length(),
                        in_buffer.border(),
                        pass.condition,
                    );
                }
            }
        } else {
            in_buffer.set_ptr(in_ptr as *mut u8);
        }
        if !staging.output {
            out_buffer.set_ptr(out_ptr);
        }

        line_filter.filter(SeparableLineFilterParams {
            in_buffer: &in_buffer,
            out_buffer: &mut out_buffer,
            dimension: dim,
            position: line.coordinates.as_slice(),
            thread: 0,
        })?;

        if staging.output {
            // SAFETY: the line lies inside `out_image`.
            unsafe {
                copy_buffer(
                    out_buffer.raw().as_const(),
                    RawLine {
                        ptr: out_ptr,
                        ..target
                    },
                    out_length,
                    out_buffer.tensor_length(),
                    &TensorLookup::Identity,
                )
            };
        }
    }
    Ok(())
}
