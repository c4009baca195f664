//! Audio model, capture devices and the processing stages.

#[cfg(feature = "cpal-audio")]
pub mod capture;
pub mod decode;
pub mod noise;
pub mod normalize;
pub mod pcm;
pub mod recorder;
pub mod source;
pub mod wav;
