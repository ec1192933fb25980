//! Writes tiny ONNX graphs for exercising the real runtime backend.
//!
//! The graphs average the image over its spatial axes, so each of the three
//! scores is the mean of one color channel and the dominant channel wins.

use std::path::{Path, PathBuf};

/// `TensorProto.DataType` values
pub const FLOAT: u64 = 1;
pub const UINT8: u64 = 2;

const IR_VERSION: u64 = 8;
const OPSET_VERSION: u64 = 13;

const WIRE_VARINT: u64 = 0;
const WIRE_LEN: u64 = 2;

fn varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

fn int_field(out: &mut Vec<u8>, field: u64, value: u64) {
    varint(out, (field << 3) | WIRE_VARINT);
    varint(out, value);
}

fn bytes_field(out: &mut Vec<u8>, field: u64, bytes: &[u8]) {
    varint(out, (field << 3) | WIRE_LEN);
    varint(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

fn value_info(name: &str, elem_type: u64, shape: &[u64]) -> Vec<u8> {
    let mut dims = Vec::new();
    for &d in shape {
        let mut dim = Vec::new();
        int_field(&mut dim, 1, d);
        bytes_field(&mut dims, 1, &dim);
    }

    let mut tensor_type = Vec::new();
    int_field(&mut tensor_type, 1, elem_type);
    bytes_field(&mut tensor_type, 2, &dims);

    let mut type_proto = Vec::new();
    bytes_field(&mut type_proto, 1, &tensor_type);

    let mut info = Vec::new();
    bytes_field(&mut info, 1, name.as_bytes());
    bytes_field(&mut info, 2, &type_proto);
    info
}

fn int_attribute(name: &str, value: u64) -> Vec<u8> {
    let mut attr = Vec::new();
    bytes_field(&mut attr, 1, name.as_bytes());
    int_field(&mut attr, 3, value);
    int_field(&mut attr, 20, 2); // INT
    attr
}

fn ints_attribute(name: &str, values: &[u64]) -> Vec<u8> {
    let mut attr = Vec::new();
    bytes_field(&mut attr, 1, name.as_bytes());
    for &v in values {
        int_field(&mut attr, 8, v);
    }
    int_field(&mut attr, 20, 7); // INTS
    attr
}

fn node(op_type: &str, input: &str, output: &str, attributes: &[Vec<u8>]) -> Vec<u8> {
    let mut node = Vec::new();
    bytes_field(&mut node, 1, input.as_bytes());
    bytes_field(&mut node, 2, output.as_bytes());
    bytes_field(&mut node, 3, format!("{}_{}", op_type, output).as_bytes());
    bytes_field(&mut node, 4, op_type.as_bytes());
    for attr in attributes {
        bytes_field(&mut node, 5, attr);
    }
    node
}

/// Serializes a model with one input `image` of `input_shape` / `elem_type`
/// and one `[1, 3]` float output `scores`, the mean over `spatial_axes`.
pub fn channel_mean_model(input_shape: &[u64], elem_type: u64, spatial_axes: &[u64]) -> Vec<u8> {
    let mut graph = Vec::new();

    let mut reduce_input = "image";
    if elem_type != FLOAT {
        let cast = node("Cast", "image", "image_f32", &[int_attribute("to", FLOAT)]);
        bytes_field(&mut graph, 1, &cast);
        reduce_input = "image_f32";
    }
    let reduce = node(
        "ReduceMean",
        reduce_input,
        "scores",
        &[ints_attribute("axes", spatial_axes), int_attribute("keepdims", 0)],
    );
    bytes_field(&mut graph, 1, &reduce);
    bytes_field(&mut graph, 2, b"channel_mean");
    bytes_field(&mut graph, 11, &value_info("image", elem_type, input_shape));
    bytes_field(&mut graph, 12, &value_info("scores", FLOAT, &[1, 3]));

    let mut opset = Vec::new();
    bytes_field(&mut opset, 1, b"");
    int_field(&mut opset, 2, OPSET_VERSION);

    let mut model = Vec::new();
    int_field(&mut model, 1, IR_VERSION);
    bytes_field(&mut model, 2, b"leafscan-tests");
    bytes_field(&mut model, 7, &graph);
    bytes_field(&mut model, 8, &opset);
    model
}

/// Channels-last `[1, 128, 128, 3]` float model, the layout the service expects.
pub fn nhwc_model() -> Vec<u8> {
    channel_mean_model(&[1, 128, 128, 3], FLOAT, &[1, 2])
}

/// Channels-first `[1, 3, 128, 128]` float model.
pub fn nchw_model() -> Vec<u8> {
    channel_mean_model(&[1, 3, 128, 128], FLOAT, &[2, 3])
}

/// Channels-last model that takes raw `u8` pixels.
pub fn uint8_model() -> Vec<u8> {
    channel_mean_model(&[1, 128, 128, 3], UINT8, &[1, 2])
}

pub fn write_model(dir: &Path, name: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, bytes)?;
    Ok(path)
}
