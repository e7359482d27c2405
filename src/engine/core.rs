mod encoder;
mod ffmpeg_cmd;
mod ffmpeg_info;
mod format;
mod scan;
mod types;

pub use encoder::{EncoderChoice, EncoderSource, select_encoder, select_for_format};
pub use ffmpeg_cmd::{
    FfmpegOutput, build_arguments, build_arguments_with_extra, format_ffmpeg_cmd, run_ffmpeg,
    split_extra_args,
};
pub use ffmpeg_info::{FfmpegEncoders, ffmpeg_version, parse_encoder_list, probe_encoders};
pub use format::{
    AUDIO_FORMATS, AudioFormat, extension_of, is_audio_file, is_lossy_extension, lookup_format,
};
pub use scan::{is_blacklisted, mirror_dir, plan_jobs, plan_jobs_with_policy};
pub use types::{Job, JobKind, JobOptions, JobReport, LossyPolicy, NO_EXIT_CODE};
