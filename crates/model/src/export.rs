//! Export of the quantized model as a C header for the microcontroller build
//!
//! The layout is fixed so the same model always renders to the same bytes:
//! weight matrices as `const PROGMEM char name[rows][cols]` with one output
//! neuron per row, every value right-aligned to width 4, followed by the shift
//! and dimension `#define`s.

use std::fmt::Write as _;
use std::path::Path;

use digitnet_fixed_point::QuantizedTensor;

use crate::error::Result;
use crate::network::QuantizedNetwork;

fn format_values(values: &[i8]) -> String {
    values
        .iter()
        .map(|v| format!("{:4}", v))
        .collect::<Vec<_>>()
        .join(", ")
}

fn write_matrix(out: &mut String, name: &str, tensor: &QuantizedTensor) {
    let (rows, cols) = (tensor.shape()[0], tensor.shape()[1]);
    let body = tensor
        .data()
        .chunks(cols)
        .map(format_values)
        .collect::<Vec<_>>()
        .join("},\n{");
    let _ = write!(
        out,
        "const PROGMEM char {}[{}][{}] = {{\n{{{}}}}};\n\n",
        name, rows, cols, body
    );
}

fn write_vector(out: &mut String, name: &str, tensor: &QuantizedTensor) {
    let _ = write!(
        out,
        "const PROGMEM char {}[{}] = {{{}}};\n\n",
        name,
        tensor.len(),
        format_values(tensor.data())
    );
}

/// Render `network.h`
pub fn render_header(network: &QuantizedNetwork) -> String {
    let mut out = String::from("#ifndef NETWORK_H\n#define NETWORK_H\n\n");

    write_matrix(&mut out, "l1_weights", network.l1_weights());
    write_vector(&mut out, "l1_bias", network.l1_bias());
    write_matrix(&mut out, "l2_weights", network.l2_weights());
    write_vector(&mut out, "l2_bias", network.l2_bias());

    for (name, bits) in [
        ("img_bits", network.img_bits()),
        ("l1w_bits", network.l1_weights().shift()),
        ("l1b_bits", network.l1_bias().shift()),
        ("l2w_bits", network.l2_weights().shift()),
        ("l2b_bits", network.l2_bias().shift()),
    ] {
        let _ = writeln!(out, "#define {} {}", name, bits);
    }

    out.push('\n');
    for (name, size) in [
        ("img_size", network.input_size()),
        ("l1_size", network.hidden_size()),
        ("l2_size", network.output_size()),
    ] {
        let _ = writeln!(out, "#define {} {}", name, size);
    }

    out.push_str("\n#endif // NETWORK_H");
    out
}

/// Write `network.h` atomically: a failed export leaves no partial file
pub fn write_header<P: AsRef<Path>>(network: &QuantizedNetwork, path: P) -> Result<()> {
    let path = path.as_ref();
    let staging = path.with_extension("h.partial");
    std::fs::write(&staging, render_header(network))?;
    std::fs::rename(&staging, path)?;
    tracing::info!(path = %path.display(), "exported header");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tensor(data: Vec<i8>, shape: Vec<usize>, shift: i32) -> QuantizedTensor {
        QuantizedTensor::from_raw(data, shape, shift).unwrap()
    }

    fn tiny() -> QuantizedNetwork {
        QuantizedNetwork::new(
            tensor(vec![1, -2, 3, 127, -128, 0], vec![2, 3], 9),
            tensor(vec![10, -10], vec![2], 7),
            tensor(vec![5, -6, 7, 8], vec![2, 2], 6),
            tensor(vec![-1, 2], vec![2], 10),
            8,
        )
        .unwrap()
    }

    #[test]
    fn test_render_exact_layout() {
        let expected = "#ifndef NETWORK_H\n#define NETWORK_H\n\n\
const PROGMEM char l1_weights[2][3] = {\n\
{   1,   -2,    3},\n\
{ 127, -128,    0}};\n\n\
const PROGMEM char l1_bias[2] = {  10,  -10};\n\n\
const PROGMEM char l2_weights[2][2] = {\n\
{   5,   -6},\n\
{   7,    8}};\n\n\
const PROGMEM char l2_bias[2] = {  -1,    2};\n\n\
#define img_bits 8\n\
#define l1w_bits 9\n\
#define l1b_bits 7\n\
#define l2w_bits 6\n\
#define l2b_bits 10\n\
\n\
#define img_size 3\n\
#define l1_size 2\n\
#define l2_size 2\n\
\n\
#endif // NETWORK_H";
        assert_eq!(render_header(&tiny()), expected);
    }

    #[test]
    fn test_render_is_reproducible() {
        assert_eq!(render_header(&tiny()), render_header(&tiny().clone()));
    }

    #[test]
    fn test_write_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("network.h");
        write_header(&tiny(), &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, render_header(&tiny()));
        assert!(!dir.path().join("network.h.partial").exists());
    }
}
