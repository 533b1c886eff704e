extern crate ffmpeg_next as ffmpeg;

use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use color_eyre::eyre::{self, Context};
use ffmpeg::codec::Context as CodecContext;
use ffmpeg::decoder::Video as DecoderVideo;
use ffmpeg::format::context::Input as FormatContext;
use ffmpeg::format::{input_with_dictionary, Pixel};
use ffmpeg::frame::Video as FrameVideo;
use ffmpeg::media::Type;
use ffmpeg::software::scaling::context::Context as ScalingContext;
use ffmpeg::util::log as ffmpeglog;
use ffmpeg::{Dictionary, Packet as CodecPacket, Rational};
use ffmpeg_sys_next::{AV_NOPTS_VALUE, AV_TIME_BASE};
use image::RgbImage;

use crate::keyframe::{
    extractor::{FrameReader, StreamOpener},
    logger::{self, fault, warning},
};

pub type Result<T> = eyre::Result<T>;

static FFMPEG_INITIALIZED: OnceLock<std::result::Result<(), ffmpeg::Error>> =
    OnceLock::new();

/// Initializes ffmpeg, including its network protocols, once per process.
pub fn init_ffmpeg() -> Result<()> {
    if let Err(e) = FFMPEG_INITIALIZED.get_or_init(|| {
        ffmpeg::init()?;
        ffmpeg::format::network::init();
        ffmpeglog::set_level(ffmpeglog::Level::Warning);
        Ok(())
    }) {
        return Err(*e).wrap_err("Failed to initialize ffmpeg");
    }
    Ok(())
}

fn open_input(url: &str) -> Result<FormatContext> {
    init_ffmpeg()?;
    let options = {
        let mut options = Dictionary::new();
        options.set("analyzeduration", "10M");
        options.set("probesize", "5M"); // this is the default
        options
    };
    input_with_dictionary(Path::new(url), options).wrap_err("Failed to open the stream")
}

/// The duration of the media at `url` in seconds, if the container or the video stream
/// knows it.
pub fn probe_duration(url: &str) -> Result<Option<f64>> {
    let ictx = open_input(url)?;
    if ictx.duration() != AV_NOPTS_VALUE && ictx.duration() > 0 {
        return Ok(Some(ictx.duration() as f64 / f64::from(AV_TIME_BASE)));
    }

    Ok(ictx
        .streams()
        .best(Type::Video)
        .filter(|video| video.duration() != AV_NOPTS_VALUE && video.duration() > 0)
        .map(|video| video.duration() as f64 * f64::from(video.time_base())))
}

/// Reads the best video stream of a file or URL from the beginning, frame by frame.
/// Never seeks.
pub struct FfmpegFrameReader<L: logger::Logger = logger::LogLogger> {
    logger: L,

    // ffmpeg contexts
    ictx: FormatContext,
    decoder: DecoderVideo,
    converter: ScalingContext,

    // metadata
    video_stream_index: usize,
    orientation: Orientation,
    frame_rate: Option<f64>,
    frame_count: Option<u64>,
    frames_read: u64,
}

impl FfmpegFrameReader<logger::LogLogger> {
    pub fn new(url: &str) -> Result<Self> {
        Self::new_with_logger(url, logger::LogLogger)
    }
}

impl<L> FfmpegFrameReader<L>
where
    L: logger::Logger,
{
    pub fn new_with_logger(url: &str, logger: L) -> Result<Self> {
        let mut ictx = open_input(url)?;

        let video = ictx
            .streams()
            .best(Type::Video)
            .ok_or(eyre::eyre!("No video stream"))?;

        let video_stream_index = video.index();
        let frame_rate = rational_to_fps(video.avg_frame_rate())
            .or_else(|| rational_to_fps(video.rate()));
        let frame_count = u64::try_from(video.frames()).ok().filter(|n| *n > 0);

        let orientation = match get_orientation(&video) {
            Some(x) => x,
            None => {
                warning!(logger, "Got a weird orientation angle, ignoring");
                Orientation::Normal
            }
        };

        let decoder = CodecContext::from_parameters(video.parameters())
            .wrap_err("No codec found")?
            .decoder()
            .video()
            .wrap_err("No codec found, of type video (?)")?;

        let converter = Self::pixel_converter(&decoder)?;

        ictx.streams_mut()
            .filter(|stream| stream.index() != video_stream_index)
            .for_each(|mut stream| stream_set_discard_all(&mut stream));

        Ok(Self {
            logger,
            ictx,
            decoder,
            converter,
            video_stream_index,
            orientation,
            frame_rate,
            frame_count,
            frames_read: 0,
        })
    }

    fn pixel_converter(decoder: &DecoderVideo) -> Result<ScalingContext> {
        eyre::ensure!(decoder.format() != Pixel::None, "No pixel format");
        Ok(ScalingContext::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            // http://git.videolan.org/?p=ffmpeg.git;a=blob;f=libavutil/pixfmt.h;hb=HEAD
            Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::Flags::FAST_BILINEAR,
        )?)
    }

    /// The next decoded frame, or `None` at the end of the stream.
    pub fn next(&mut self) -> Result<Option<RgbImage>> {
        loop {
            let mut frame = FrameVideo::empty();
            // avcodec_receive_frame
            // https://ffmpeg.org/doxygen/trunk/group__lavc__decoding.html#ga11e6542c4e66d3028668788a1a74217c
            match self.decoder.receive_frame(&mut frame) {
                Ok(()) => {
                    let mut converted = FrameVideo::empty();
                    self.converter
                        .run(&frame, &mut converted)
                        .wrap_err("Failed to convert the decoded frame")?;
                    let img = undo_rotation(create_rust_image(converted), self.orientation);
                    self.frames_read += 1;
                    return Ok(Some(img));
                }
                Err(ffmpeg::Error::Other {
                    errno: libc::EAGAIN,
                }) => (),
                // End of stream situations.
                // https://ffmpeg.org/doxygen/trunk/avcodec_8h_source.html
                Err(ffmpeg::Error::Eof) => return Ok(None),
                Err(e) => {
                    return Err(e).wrap_err("Decoder error when receiving a frame from it");
                }
            }

            loop {
                // http://ffmpeg.org/doxygen/trunk/group__lavf__decoding.html#ga4fdb3084415a82e3810de6ee60e46a61
                let mut packet = CodecPacket::empty();
                match packet.read(&mut self.ictx) {
                    Ok(()) if packet.stream() == self.video_stream_index => {
                        match self.decoder.send_packet(&packet) {
                            Ok(()) => break,
                            Err(e) => {
                                fault!(
                                    self.logger,
                                    "Failed to decode a packet after frame {}: {}",
                                    self.frames_read,
                                    e
                                );
                                continue;
                            }
                        }
                    }
                    Ok(()) => continue,
                    Err(ffmpeg::Error::Eof) => {
                        self.decoder
                            .send_eof()
                            .wrap_err("Failed to send EOF to the decoder")?;
                        break;
                    }
                    Err(e) => {
                        eyre::bail!("Failed to read a packet from the stream: {e}");
                    }
                }
            }
        }
    }
}

impl<L: logger::Logger> FrameReader for FfmpegFrameReader<L> {
    fn frame_rate(&self) -> Option<f64> {
        self.frame_rate
    }

    fn frame_count(&self) -> Option<u64> {
        self.frame_count
    }

    fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        self.next()
    }
}

/// Opens [`FfmpegFrameReader`]s that log through the `log` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegOpener;

impl StreamOpener for FfmpegOpener {
    type Reader = FfmpegFrameReader;

    fn open(&self, url: &str) -> Result<Self::Reader> {
        FfmpegFrameReader::new(url)
    }
}

fn rational_to_fps(rate: Rational) -> Option<f64> {
    if rate.numerator() <= 0 || rate.denominator() <= 0 {
        return None;
    }
    Some(f64::from(rate))
}

#[derive(Clone, Copy, Debug)]
enum Orientation {
    Normal,
    Left,
    Right,
    Upside,
}

fn get_orientation(video: &ffmpeg::Stream) -> Option<Orientation> {
    for data in video.side_data() {
        if data.kind() != ffmpeg::packet::side_data::Type::DisplayMatrix {
            continue;
        }
        let rot = unsafe {
            ffmpeg_sys_next::av_display_rotation_get(data.data().as_ptr() as *const i32)
        };

        if rot.is_finite() {
            return match rot.round() as i32 {
                -90 => Some(Orientation::Right),
                90 => Some(Orientation::Left),
                0 => Some(Orientation::Normal),
                180 | -180 => Some(Orientation::Upside),
                _ => None,
            };
        }
    }

    Some(Orientation::Normal)
}

fn undo_rotation(img: RgbImage, ori: Orientation) -> RgbImage {
    match ori {
        Orientation::Normal => img,
        Orientation::Right => image::imageops::rotate90(&img),
        Orientation::Left => image::imageops::rotate270(&img),
        Orientation::Upside => image::imageops::rotate180(&img),
    }
}

/// Copies the RGB24 plane of `converted`, dropping any row padding.
fn create_rust_image(converted: FrameVideo) -> RgbImage {
    assert_eq!(Pixel::RGB24, converted.format());
    assert_eq!(1, converted.planes());

    let src_linesize = converted.stride(0);
    let width = converted.width() as usize;
    let height = converted.height() as usize;
    let data = converted.data(0);
    let trg_linesize = 3 * width;

    let data = if src_linesize == trg_linesize {
        data[..trg_linesize * height].to_vec()
    } else {
        assert!(src_linesize >= trg_linesize);
        data.chunks(src_linesize)
            .take(height)
            .flat_map(|row| &row[..trg_linesize])
            .copied()
            .collect()
    };

    RgbImage::from_vec(converted.width(), converted.height(), data)
        .expect("the buffer is big enough!")
}

fn stream_set_discard_all(stream: &mut ffmpeg::StreamMut<'_>) {
    unsafe {
        let ptr = stream.as_mut_ptr();
        if !ptr.is_null() {
            (*ptr).discard = ffmpeg_sys_next::AVDiscard::AVDISCARD_ALL;
        }
    }
}

impl<L: logger::Logger> fmt::Debug for FfmpegFrameReader<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            video_stream_index,
            orientation,
            frame_rate,
            frame_count,
            frames_read,
            ..
        } = self;

        f.debug_struct("FfmpegFrameReader")
            .field("stream", video_stream_index)
            .field("orientation", orientation)
            .field("fps", frame_rate)
            .field("frames", frame_count)
            .field("read", frames_read)
            .finish()
    }
}
