pub mod wav;
pub use wav::pcm_to_wav;
