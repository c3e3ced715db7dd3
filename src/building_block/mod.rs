pub mod circuit;
pub mod evaluator;
pub mod gate;
pub mod garbled_table;
pub mod garbler;
pub mod gate_type;
pub mod key_material;
pub mod ot;
pub mod output_decoding_table;
pub mod wire;
pub mod wire_label;
pub mod util;
