//! Decoder Adapter - symphonia 音频解码实现

mod wav_decoder;

pub use wav_decoder::SymphoniaDecoder;
