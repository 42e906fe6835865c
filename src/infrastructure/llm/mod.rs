mod deepseek;

pub use deepseek::DeepSeekChat;
