pub mod pcm;
pub mod tone;
pub mod wav_format;
