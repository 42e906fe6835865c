mod deepseek;

pub use deepseek::DeepSeekEmbedding;
