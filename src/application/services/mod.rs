//! Application Services - 端口之上的编排服务

mod speech_synthesizer;
mod stream_pipeline;

pub use speech_synthesizer::SpeechSynthesizer;
pub use stream_pipeline::{StreamError, StreamOutcome, StreamPipeline, StreamTarget};
