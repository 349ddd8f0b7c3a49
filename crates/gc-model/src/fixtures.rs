// Deterministic ONNX models for tests, encoded in memory.
//
// Graph: spectrogram [1, bands, frames, 1] → Flatten → MatMul → Add → Softmax.

/// Graph input name of every fixture model.
pub const INPUT_NAME: &str = "spectrogram";

const OUTPUT_NAME: &str = "probabilities";
const IR_VERSION: u64 = 8;
const OPSET: u64 = 13;
const FLOAT: u64 = 1;

const VARINT: u32 = 0;
const LEN: u32 = 2;

/// Protobuf message under construction.
#[derive(Default)]
struct Message(Vec<u8>);

impl Message {
    fn varint(buf: &mut Vec<u8>, mut v: u64) {
        while v >= 0x80 {
            buf.push((v as u8) | 0x80);
            v >>= 7;
        }
        buf.push(v as u8);
    }

    fn tag(&mut self, field: u32, wire: u32) {
        Self::varint(&mut self.0, u64::from((field << 3) | wire));
    }

    fn uint(mut self, field: u32, v: u64) -> Self {
        self.tag(field, VARINT);
        Self::varint(&mut self.0, v);
        self
    }

    fn bytes(mut self, field: u32, data: &[u8]) -> Self {
        self.tag(field, LEN);
        Self::varint(&mut self.0, data.len() as u64);
        self.0.extend_from_slice(data);
        self
    }

    fn string(self, field: u32, s: &str) -> Self {
        self.bytes(field, s.as_bytes())
    }

    fn message(self, field: u32, m: &Message) -> Self {
        self.bytes(field, &m.0)
    }
}

// TensorProto: dims=1, data_type=2, name=8, raw_data=9.
fn initializer(name: &str, dims: &[usize], data: &[f32]) -> Message {
    let mut m = Message::default();
    for &d in dims {
        m = m.uint(1, d as u64);
    }
    let raw: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
    m.uint(2, FLOAT).string(8, name).bytes(9, &raw)
}

// ValueInfoProto { name, type: TypeProto { tensor_type: { elem_type, shape } } }.
fn value_info(name: &str, dims: &[usize]) -> Message {
    let shape = dims.iter().fold(Message::default(), |shape, &d| {
        shape.message(1, &Message::default().uint(1, d as u64))
    });
    let tensor = Message::default().uint(1, FLOAT).message(2, &shape);
    let ty = Message::default().message(1, &tensor);
    Message::default().string(1, name).message(2, &ty)
}

// NodeProto: input=1, output=2, name=3, op_type=4.
fn node(op: &str, inputs: &[&str], output: &str) -> Message {
    let m = inputs
        .iter()
        .fold(Message::default(), |m, input| m.string(1, input));
    m.string(2, output).string(3, output).string(4, op)
}

/// Flatten → dense softmax with an explicit `[bands * frames, classes]`
/// kernel. Row `b * frames + f` holds the weights of cell `(b, f)`.
#[must_use]
pub fn dense_model(input: (usize, usize), kernel: &[f32], bias: &[f32]) -> Vec<u8> {
    let (bands, frames) = input;
    let classes = bias.len();
    let graph = Message::default()
        .message(1, &node("Flatten", &[INPUT_NAME], "flat"))
        .message(1, &node("MatMul", &["flat", "kernel"], "logits"))
        .message(1, &node("Add", &["logits", "bias"], "scores"))
        .message(1, &node("Softmax", &["scores"], OUTPUT_NAME))
        .string(2, "chord-fixture")
        .message(5, &initializer("kernel", &[bands * frames, classes], kernel))
        .message(5, &initializer("bias", &[classes], bias))
        .message(11, &value_info(INPUT_NAME, &[1, bands, frames, 1]))
        .message(12, &value_info(OUTPUT_NAME, &[1, classes]));
    let opset = Message::default().uint(2, OPSET);

    // ModelProto: ir_version=1, producer_name=2, graph=7, opset_import=8.
    Message::default()
        .uint(1, IR_VERSION)
        .string(2, "chordrec-fixtures")
        .message(7, &graph)
        .message(8, &opset)
        .0
}

/// Dense softmax with small, deterministic, sign-alternating weights.
#[must_use]
pub fn dense_softmax(input: (usize, usize), classes: usize) -> Vec<u8> {
    let mut seed = 0u32;
    let mut next = || {
        seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
        ((seed >> 16) % 200) as f32 / 1000.0 - 0.1
    };
    let kernel: Vec<f32> = (0..input.0 * input.1 * classes).map(|_| next()).collect();
    let bias: Vec<f32> = (0..classes).map(|_| next()).collect();
    dense_model(input, &kernel, &bias)
}

/// Votes for the first class when energy sits in the lowest `bands / 8` mel
/// bands and for the last class when it sits in the top quarter.
#[must_use]
pub fn band_detector(input: (usize, usize), classes: usize) -> Vec<u8> {
    let (bands, frames) = input;
    let mut kernel = vec![0.0f32; bands * frames * classes];
    for band in 0..bands {
        let class = if band < bands / 8 {
            Some(0)
        } else if band >= bands - bands / 4 {
            Some(classes - 1)
        } else {
            None
        };
        if let Some(class) = class {
            for frame in 0..frames {
                kernel[(band * frames + frame) * classes + class] = 1.0;
            }
        }
    }
    dense_model(input, &kernel, &vec![0.0; classes])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varints_use_seven_bit_groups() {
        let mut buf = Vec::new();
        Message::varint(&mut buf, 300);
        assert_eq!(buf, [0xAC, 0x02]);
        assert_eq!(Message::default().uint(1, 8).0, [0x08, 0x08]);
        assert_eq!(Message::default().string(2, "ab").0, [0x12, 2, b'a', b'b']);
    }
}
