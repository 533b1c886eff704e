pub mod args;
pub mod batch;
pub mod ffmpeg_reader;
pub mod image_writer;
pub mod keyframe;
pub mod report;
pub mod resolver;
pub mod youtube;
