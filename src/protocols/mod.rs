pub mod messages;
pub mod network;
pub mod observer;
pub mod yao_gc;
