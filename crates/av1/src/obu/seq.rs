//! Sequence header OBU.
//! AV1-Spec-2 - 5.5

use std::io;

use bytes_util::{BitReader, BitWriter};

use super::utils::{read_uvlc, write_uvlc};
use crate::error::{Av1Error, Result};

/// `SELECT_SCREEN_CONTENT_TOOLS` / `SELECT_INTEGER_MV`
pub const SELECT: u8 = 2;

/// `color_primaries` value for BT.709.
const CP_BT_709: u8 = 1;
/// `transfer_characteristics` value for sRGB.
const TC_SRGB: u8 = 13;
/// `matrix_coefficients` value for identity.
const MC_IDENTITY: u8 = 0;

/// Sequence Header OBU
/// AV1-Spec-2 - 5.5.1
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceHeaderObu {
    /// `seq_profile`
    ///
    /// 3 bits
    pub seq_profile: u8,
    /// `still_picture`
    pub still_picture: bool,
    /// `reduced_still_picture_header`
    pub reduced_still_picture_header: bool,
    /// `timing_info()` if `timing_info_present_flag` is 1
    pub timing_info: Option<TimingInfo>,
    /// `decoder_model_info()` if `decoder_model_info_present_flag` is 1
    pub decoder_model_info: Option<DecoderModelInfo>,
    /// `initial_display_delay_present_flag`
    pub initial_display_delay_present: bool,
    /// One entry per operating point, `operating_points_cnt_minus_1 + 1` in total.
    pub operating_points: Vec<OperatingPoint>,
    /// `frame_width_bits_minus_1`
    ///
    /// 4 bits
    pub frame_width_bits_minus_1: u8,
    /// `frame_height_bits_minus_1`
    ///
    /// 4 bits
    pub frame_height_bits_minus_1: u8,
    /// `max_frame_width_minus_1`
    pub max_frame_width_minus_1: u64,
    /// `max_frame_height_minus_1`
    pub max_frame_height_minus_1: u64,
    /// Frame id lengths if `frame_id_numbers_present_flag` is 1
    pub frame_id_numbers: Option<FrameIdNumbers>,
    /// `use_128x128_superblock`
    pub use_128x128_superblock: bool,
    /// `enable_filter_intra`
    pub enable_filter_intra: bool,
    /// `enable_intra_edge_filter`
    pub enable_intra_edge_filter: bool,
    /// `enable_interintra_compound`
    pub enable_interintra_compound: bool,
    /// `enable_masked_compound`
    pub enable_masked_compound: bool,
    /// `enable_warped_motion`
    pub enable_warped_motion: bool,
    /// `enable_dual_filter`
    pub enable_dual_filter: bool,
    /// `enable_order_hint`
    pub enable_order_hint: bool,
    /// `enable_jnt_comp`
    pub enable_jnt_comp: bool,
    /// `enable_ref_frame_mvs`
    pub enable_ref_frame_mvs: bool,
    /// `seq_force_screen_content_tools`, [`SELECT`] when `seq_choose_screen_content_tools` is 1
    pub seq_force_screen_content_tools: u8,
    /// `seq_force_integer_mv`, [`SELECT`] when chosen per frame
    pub seq_force_integer_mv: u8,
    /// `OrderHintBits`, 0 when order hints are disabled
    pub order_hint_bits: u8,
    /// `enable_superres`
    pub enable_superres: bool,
    /// `enable_cdef`
    pub enable_cdef: bool,
    /// `enable_restoration`
    pub enable_restoration: bool,
    /// `color_config()`
    pub color_config: ColorConfig,
    /// `film_grain_params_present`
    pub film_grain_params_present: bool,
}

/// Timing Info
/// AV1-Spec-2 - 5.5.3
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingInfo {
    /// `num_units_in_display_tick`
    pub num_units_in_display_tick: u32,
    /// `time_scale`
    pub time_scale: u32,
    /// `num_ticks_per_picture_minus_1` if `equal_picture_interval` is 1
    pub num_ticks_per_picture_minus_1: Option<u64>,
}

/// Decoder Model Info
/// AV1-Spec-2 - 5.5.4
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderModelInfo {
    /// `buffer_delay_length_minus_1`
    ///
    /// 5 bits
    pub buffer_delay_length_minus_1: u8,
    /// `num_units_in_decoding_tick`
    pub num_units_in_decoding_tick: u32,
    /// `buffer_removal_time_length_minus_1`
    ///
    /// 5 bits
    pub buffer_removal_time_length_minus_1: u8,
    /// `frame_presentation_time_length_minus_1`
    ///
    /// 5 bits
    pub frame_presentation_time_length_minus_1: u8,
}

/// A single operating point of the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatingPoint {
    /// `operating_point_idc`
    ///
    /// 12 bits
    pub idc: u16,
    /// `seq_level_idx`
    ///
    /// 5 bits
    pub seq_level_idx: u8,
    /// `seq_tier`, only coded when `seq_level_idx > 7`
    pub seq_tier: bool,
    /// `operating_parameters_info()` if `decoder_model_present_for_this_op` is 1
    pub operating_parameters: Option<OperatingParameters>,
    /// `initial_display_delay_minus_1` if `initial_display_delay_present_for_this_op` is 1
    pub initial_display_delay_minus_1: Option<u8>,
}

/// Operating Parameters Info
/// AV1-Spec-2 - 5.5.5
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatingParameters {
    /// `decoder_buffer_delay`
    pub decoder_buffer_delay: u64,
    /// `encoder_buffer_delay`
    pub encoder_buffer_delay: u64,
    /// `low_delay_mode_flag`
    pub low_delay_mode_flag: bool,
}

/// Frame id lengths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameIdNumbers {
    /// `delta_frame_id_length_minus_2`
    ///
    /// 4 bits
    pub delta_frame_id_length_minus_2: u8,
    /// `additional_frame_id_length_minus_1`
    ///
    /// 3 bits
    pub additional_frame_id_length_minus_1: u8,
}

/// Color Config
/// AV1-Spec-2 - 5.5.2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorConfig {
    /// `BitDepth`: 8, 10 or 12
    pub bit_depth: u8,
    /// `mono_chrome`
    pub mono_chrome: bool,
    /// Color description if `color_description_present_flag` is 1
    pub color_description: Option<ColorDescription>,
    /// `color_range`
    pub full_color_range: bool,
    /// `subsampling_x`
    pub subsampling_x: bool,
    /// `subsampling_y`
    pub subsampling_y: bool,
    /// `chroma_sample_position`
    ///
    /// 2 bits
    pub chroma_sample_position: u8,
    /// `separate_uv_delta_q`
    pub separate_uv_delta_q: bool,
}

/// Color description triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorDescription {
    /// `color_primaries`
    pub color_primaries: u8,
    /// `transfer_characteristics`
    pub transfer_characteristics: u8,
    /// `matrix_coefficients`
    pub matrix_coefficients: u8,
}

impl ColorConfig {
    /// A color config with no color description and limited range.
    pub fn new(bit_depth: u8, subsampling_x: bool, subsampling_y: bool) -> Self {
        Self {
            bit_depth,
            mono_chrome: false,
            color_description: None,
            full_color_range: false,
            subsampling_x,
            subsampling_y,
            chroma_sample_position: 0,
            separate_uv_delta_q: false,
        }
    }

    /// A single plane (4:0:0) color config.
    pub fn monochrome(bit_depth: u8) -> Self {
        Self {
            mono_chrome: true,
            ..Self::new(bit_depth, true, true)
        }
    }

    fn is_srgb_identity(&self) -> bool {
        self.color_description.is_some_and(|cd| {
            cd.color_primaries == CP_BT_709
                && cd.transfer_characteristics == TC_SRGB
                && cd.matrix_coefficients == MC_IDENTITY
        })
    }

    fn parse<T: io::Read>(reader: &mut BitReader<T>, seq_profile: u8) -> Result<Self> {
        let high_bitdepth = reader.read_bit()?;
        let bit_depth = if seq_profile == 2 && high_bitdepth {
            if reader.read_bit()? { 12 } else { 10 }
        } else if high_bitdepth {
            10
        } else {
            8
        };

        let mono_chrome = if seq_profile == 1 {
            false
        } else {
            reader.read_bit()?
        };

        let color_description = if reader.read_bit()? {
            Some(ColorDescription {
                color_primaries: reader.read_bits(8)? as u8,
                transfer_characteristics: reader.read_bits(8)? as u8,
                matrix_coefficients: reader.read_bits(8)? as u8,
            })
        } else {
            None
        };

        let mut config = ColorConfig {
            bit_depth,
            mono_chrome,
            color_description,
            full_color_range: false,
            subsampling_x: true,
            subsampling_y: true,
            chroma_sample_position: 0,
            separate_uv_delta_q: false,
        };

        if mono_chrome {
            config.full_color_range = reader.read_bit()?;
            return Ok(config);
        }

        if config.is_srgb_identity() {
            config.full_color_range = true;
            config.subsampling_x = false;
            config.subsampling_y = false;
        } else {
            config.full_color_range = reader.read_bit()?;
            match seq_profile {
                0 => {}
                1 => {
                    config.subsampling_x = false;
                    config.subsampling_y = false;
                }
                _ if bit_depth == 12 => {
                    config.subsampling_x = reader.read_bit()?;
                    config.subsampling_y = config.subsampling_x && reader.read_bit()?;
                }
                _ => config.subsampling_y = false,
            }

            if config.subsampling_x && config.subsampling_y {
                config.chroma_sample_position = reader.read_bits(2)? as u8;
            }
        }

        config.separate_uv_delta_q = reader.read_bit()?;
        Ok(config)
    }

    fn mux<W: io::Write>(&self, writer: &mut BitWriter<W>, seq_profile: u8) -> io::Result<()> {
        writer.write_bit(self.bit_depth > 8)?;
        if seq_profile == 2 && self.bit_depth > 8 {
            writer.write_bit(self.bit_depth == 12)?;
        }

        if seq_profile != 1 {
            writer.write_bit(self.mono_chrome)?;
        }

        writer.write_bit(self.color_description.is_some())?;
        if let Some(cd) = &self.color_description {
            writer.write_bits(cd.color_primaries as u64, 8)?;
            writer.write_bits(cd.transfer_characteristics as u64, 8)?;
            writer.write_bits(cd.matrix_coefficients as u64, 8)?;
        }

        if self.mono_chrome {
            return writer.write_bit(self.full_color_range);
        }

        if !self.is_srgb_identity() {
            writer.write_bit(self.full_color_range)?;
            if seq_profile == 2 && self.bit_depth == 12 {
                writer.write_bit(self.subsampling_x)?;
                if self.subsampling_x {
                    writer.write_bit(self.subsampling_y)?;
                }
            }

            if self.subsampling_x && self.subsampling_y {
                writer.write_bits(self.chroma_sample_position as u64, 2)?;
            }
        }

        writer.write_bit(self.separate_uv_delta_q)
    }
}

impl SequenceHeaderObu {
    /// Builds a single operating point header for the given geometry.
    ///
    /// The lowest profile able to carry `color_config` is selected and
    /// `seq_level_idx` is set to 31 (no level constraints).
    pub fn new(max_frame_width: u32, max_frame_height: u32, color_config: ColorConfig) -> Self {
        let four_four_four = !color_config.subsampling_x && !color_config.subsampling_y;
        let four_two_zero = color_config.subsampling_x && color_config.subsampling_y;
        let seq_profile = if color_config.bit_depth == 12 {
            2
        } else if color_config.mono_chrome || four_two_zero {
            0
        } else if four_four_four {
            1
        } else {
            2
        };

        let width_bits = bits_for(u64::from(max_frame_width.max(1)) - 1);
        let height_bits = bits_for(u64::from(max_frame_height.max(1)) - 1);

        Self {
            seq_profile,
            still_picture: false,
            reduced_still_picture_header: false,
            timing_info: None,
            decoder_model_info: None,
            initial_display_delay_present: false,
            operating_points: vec![OperatingPoint {
                idc: 0,
                seq_level_idx: 31,
                seq_tier: false,
                operating_parameters: None,
                initial_display_delay_minus_1: None,
            }],
            frame_width_bits_minus_1: width_bits - 1,
            frame_height_bits_minus_1: height_bits - 1,
            max_frame_width_minus_1: u64::from(max_frame_width.max(1)) - 1,
            max_frame_height_minus_1: u64::from(max_frame_height.max(1)) - 1,
            frame_id_numbers: None,
            use_128x128_superblock: false,
            enable_filter_intra: true,
            enable_intra_edge_filter: true,
            enable_interintra_compound: false,
            enable_masked_compound: false,
            enable_warped_motion: false,
            enable_dual_filter: false,
            enable_order_hint: true,
            enable_jnt_comp: false,
            enable_ref_frame_mvs: false,
            seq_force_screen_content_tools: 0,
            seq_force_integer_mv: SELECT,
            order_hint_bits: 7,
            enable_superres: false,
            enable_cdef: true,
            enable_restoration: true,
            color_config,
            film_grain_params_present: false,
        }
    }

    /// Parses a sequence header from the OBU payload (the bytes following the OBU header).
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let mut reader = BitReader::new(io::Cursor::new(payload));

        let seq_profile = reader.read_bits(3)? as u8;
        if seq_profile > 2 {
            return Err(Av1Error::InvalidSequenceHeader(format!(
                "reserved seq_profile {seq_profile}"
            )));
        }

        let still_picture = reader.read_bit()?;
        let reduced_still_picture_header = reader.read_bit()?;
        if reduced_still_picture_header && !still_picture {
            return Err(Av1Error::InvalidSequenceHeader(
                "reduced_still_picture_header requires still_picture".into(),
            ));
        }

        let mut timing_info = None;
        let mut decoder_model_info = None;
        let mut initial_display_delay_present = false;
        let mut operating_points = Vec::new();

        if reduced_still_picture_header {
            operating_points.push(OperatingPoint {
                idc: 0,
                seq_level_idx: reader.read_bits(5)? as u8,
                seq_tier: false,
                operating_parameters: None,
                initial_display_delay_minus_1: None,
            });
        } else {
            if reader.read_bit()? {
                timing_info = Some(TimingInfo::parse(&mut reader)?);
                if reader.read_bit()? {
                    decoder_model_info = Some(DecoderModelInfo::parse(&mut reader)?);
                }
            }

            initial_display_delay_present = reader.read_bit()?;
            let operating_points_cnt = reader.read_bits(5)? as usize + 1;
            for _ in 0..operating_points_cnt {
                operating_points.push(OperatingPoint::parse(
                    &mut reader,
                    decoder_model_info.as_ref(),
                    initial_display_delay_present,
                )?);
            }
        }

        let frame_width_bits_minus_1 = reader.read_bits(4)? as u8;
        let frame_height_bits_minus_1 = reader.read_bits(4)? as u8;
        let max_frame_width_minus_1 = reader.read_bits(frame_width_bits_minus_1 + 1)?;
        let max_frame_height_minus_1 = reader.read_bits(frame_height_bits_minus_1 + 1)?;

        let frame_id_numbers = if !reduced_still_picture_header && reader.read_bit()? {
            let ids = FrameIdNumbers {
                delta_frame_id_length_minus_2: reader.read_bits(4)? as u8,
                additional_frame_id_length_minus_1: reader.read_bits(3)? as u8,
            };
            let frame_id_length =
                ids.delta_frame_id_length_minus_2 + ids.additional_frame_id_length_minus_1 + 3;
            if frame_id_length > 16 {
                return Err(Av1Error::InvalidSequenceHeader(format!(
                    "frame id length {frame_id_length} exceeds 16"
                )));
            }
            Some(ids)
        } else {
            None
        };

        let use_128x128_superblock = reader.read_bit()?;
        let enable_filter_intra = reader.read_bit()?;
        let enable_intra_edge_filter = reader.read_bit()?;

        let mut header = SequenceHeaderObu {
            seq_profile,
            still_picture,
            reduced_still_picture_header,
            timing_info,
            decoder_model_info,
            initial_display_delay_present,
            operating_points,
            frame_width_bits_minus_1,
            frame_height_bits_minus_1,
            max_frame_width_minus_1,
            max_frame_height_minus_1,
            frame_id_numbers,
            use_128x128_superblock,
            enable_filter_intra,
            enable_intra_edge_filter,
            enable_interintra_compound: false,
            enable_masked_compound: false,
            enable_warped_motion: false,
            enable_dual_filter: false,
            enable_order_hint: false,
            enable_jnt_comp: false,
            enable_ref_frame_mvs: false,
            seq_force_screen_content_tools: SELECT,
            seq_force_integer_mv: SELECT,
            order_hint_bits: 0,
            enable_superres: false,
            enable_cdef: false,
            enable_restoration: false,
            color_config: ColorConfig {
                bit_depth: 8,
                mono_chrome: false,
                color_description: None,
                full_color_range: false,
                subsampling_x: true,
                subsampling_y: true,
                chroma_sample_position: 0,
                separate_uv_delta_q: false,
            },
            film_grain_params_present: false,
        };

        if !reduced_still_picture_header {
            header.enable_interintra_compound = reader.read_bit()?;
            header.enable_masked_compound = reader.read_bit()?;
            header.enable_warped_motion = reader.read_bit()?;
            header.enable_dual_filter = reader.read_bit()?;
            header.enable_order_hint = reader.read_bit()?;
            if header.enable_order_hint {
                header.enable_jnt_comp = reader.read_bit()?;
                header.enable_ref_frame_mvs = reader.read_bit()?;
            }

            // seq_choose_screen_content_tools
            if !reader.read_bit()? {
                header.seq_force_screen_content_tools = reader.read_bits(1)? as u8;
            }

            // seq_choose_integer_mv
            if header.seq_force_screen_content_tools > 0 && !reader.read_bit()? {
                header.seq_force_integer_mv = reader.read_bits(1)? as u8;
            }

            if header.enable_order_hint {
                header.order_hint_bits = reader.read_bits(3)? as u8 + 1;
            }
        }

        header.enable_superres = reader.read_bit()?;
        header.enable_cdef = reader.read_bit()?;
        header.enable_restoration = reader.read_bit()?;
        header.color_config = ColorConfig::parse(&mut reader, seq_profile)?;
        header.film_grain_params_present = reader.read_bit()?;

        Ok(header)
    }

    /// Writes the sequence header payload followed by the trailing bits.
    ///
    /// Returns the number of bytes written.
    pub fn mux<W: io::Write>(&self, writer: &mut W) -> io::Result<usize> {
        let mut buf = Vec::new();
        let mut bits = BitWriter::new(&mut buf);

        bits.write_bits(self.seq_profile as u64, 3)?;
        bits.write_bit(self.still_picture)?;
        bits.write_bit(self.reduced_still_picture_header)?;

        if self.reduced_still_picture_header {
            let seq_level_idx = self.operating_points.first().map_or(0, |op| op.seq_level_idx);
            bits.write_bits(seq_level_idx as u64, 5)?;
        } else {
            bits.write_bit(self.timing_info.is_some())?;
            if let Some(timing_info) = &self.timing_info {
                timing_info.mux(&mut bits)?;
                bits.write_bit(self.decoder_model_info.is_some())?;
                if let Some(model) = &self.decoder_model_info {
                    model.mux(&mut bits)?;
                }
            }

            bits.write_bit(self.initial_display_delay_present)?;
            let count = self.operating_points.len().clamp(1, 32);
            bits.write_bits((count - 1) as u64, 5)?;
            for op in self.operating_points.iter().take(count) {
                op.mux(
                    &mut bits,
                    self.decoder_model_info.as_ref(),
                    self.initial_display_delay_present,
                )?;
            }
        }

        bits.write_bits(self.frame_width_bits_minus_1 as u64, 4)?;
        bits.write_bits(self.frame_height_bits_minus_1 as u64, 4)?;
        bits.write_bits(self.max_frame_width_minus_1, self.frame_width_bits_minus_1 + 1)?;
        bits.write_bits(self.max_frame_height_minus_1, self.frame_height_bits_minus_1 + 1)?;

        if !self.reduced_still_picture_header {
            bits.write_bit(self.frame_id_numbers.is_some())?;
            if let Some(ids) = &self.frame_id_numbers {
                bits.write_bits(ids.delta_frame_id_length_minus_2 as u64, 4)?;
                bits.write_bits(ids.additional_frame_id_length_minus_1 as u64, 3)?;
            }
        }

        bits.write_bit(self.use_128x128_superblock)?;
        bits.write_bit(self.enable_filter_intra)?;
        bits.write_bit(self.enable_intra_edge_filter)?;

        if !self.reduced_still_picture_header {
            bits.write_bit(self.enable_interintra_compound)?;
            bits.write_bit(self.enable_masked_compound)?;
            bits.write_bit(self.enable_warped_motion)?;
            bits.write_bit(self.enable_dual_filter)?;
            bits.write_bit(self.enable_order_hint)?;
            if self.enable_order_hint {
                bits.write_bit(self.enable_jnt_comp)?;
                bits.write_bit(self.enable_ref_frame_mvs)?;
            }

            let choose_sct = self.seq_force_screen_content_tools == SELECT;
            bits.write_bit(choose_sct)?;
            if !choose_sct {
                bits.write_bit(self.seq_force_screen_content_tools == 1)?;
            }

            if self.seq_force_screen_content_tools > 0 {
                let choose_integer_mv = self.seq_force_integer_mv == SELECT;
                bits.write_bit(choose_integer_mv)?;
                if !choose_integer_mv {
                    bits.write_bit(self.seq_force_integer_mv == 1)?;
                }
            }

            if self.enable_order_hint {
                bits.write_bits(self.order_hint_bits.saturating_sub(1) as u64, 3)?;
            }
        }

        bits.write_bit(self.enable_superres)?;
        bits.write_bit(self.enable_cdef)?;
        bits.write_bit(self.enable_restoration)?;
        self.color_config.mux(&mut bits, self.seq_profile)?;
        bits.write_bit(self.film_grain_params_present)?;

        // trailing_bits()
        bits.write_bit(true)?;
        bits.finish()?;

        writer.write_all(&buf)?;
        Ok(buf.len())
    }

    /// Maximum frame width in pixels.
    pub fn max_frame_width(&self) -> u64 {
        self.max_frame_width_minus_1 + 1
    }

    /// Maximum frame height in pixels.
    pub fn max_frame_height(&self) -> u64 {
        self.max_frame_height_minus_1 + 1
    }

    /// Frames per second derived from `timing_info`, if the stream carries it.
    pub fn frame_rate(&self) -> Option<f64> {
        let timing = self.timing_info?;
        if timing.num_units_in_display_tick == 0 || timing.time_scale == 0 {
            return None;
        }

        let ticks_per_picture = timing.num_ticks_per_picture_minus_1.map_or(1, |t| t + 1);
        Some(
            f64::from(timing.time_scale)
                / (f64::from(timing.num_units_in_display_tick) * ticks_per_picture as f64),
        )
    }
}

/// Number of bits needed to code `value`, at least 1.
fn bits_for(value: u64) -> u8 {
    (64 - value.leading_zeros()).max(1) as u8
}

impl TimingInfo {
    fn parse<T: io::Read>(reader: &mut BitReader<T>) -> io::Result<Self> {
        let num_units_in_display_tick = reader.read_bits(32)? as u32;
        let time_scale = reader.read_bits(32)? as u32;
        let num_ticks_per_picture_minus_1 = if reader.read_bit()? {
            Some(read_uvlc(reader)?)
        } else {
            None
        };

        Ok(Self {
            num_units_in_display_tick,
            time_scale,
            num_ticks_per_picture_minus_1,
        })
    }

    fn mux<W: io::Write>(&self, writer: &mut BitWriter<W>) -> io::Result<()> {
        writer.write_bits(self.num_units_in_display_tick as u64, 32)?;
        writer.write_bits(self.time_scale as u64, 32)?;
        writer.write_bit(self.num_ticks_per_picture_minus_1.is_some())?;
        if let Some(ticks) = self.num_ticks_per_picture_minus_1 {
            write_uvlc(writer, ticks)?;
        }
        Ok(())
    }
}

impl DecoderModelInfo {
    fn parse<T: io::Read>(reader: &mut BitReader<T>) -> io::Result<Self> {
        Ok(Self {
            buffer_delay_length_minus_1: reader.read_bits(5)? as u8,
            num_units_in_decoding_tick: reader.read_bits(32)? as u32,
            buffer_removal_time_length_minus_1: reader.read_bits(5)? as u8,
            frame_presentation_time_length_minus_1: reader.read_bits(5)? as u8,
        })
    }

    fn mux<W: io::Write>(&self, writer: &mut BitWriter<W>) -> io::Result<()> {
        writer.write_bits(self.buffer_delay_length_minus_1 as u64, 5)?;
        writer.write_bits(self.num_units_in_decoding_tick as u64, 32)?;
        writer.write_bits(self.buffer_removal_time_length_minus_1 as u64, 5)?;
        writer.write_bits(self.frame_presentation_time_length_minus_1 as u64, 5)
    }
}

impl OperatingPoint {
    fn parse<T: io::Read>(
        reader: &mut BitReader<T>,
        decoder_model_info: Option<&DecoderModelInfo>,
        initial_display_delay_present: bool,
    ) -> io::Result<Self> {
        let idc = reader.read_bits(12)? as u16;
        let seq_level_idx = reader.read_bits(5)? as u8;
        let seq_tier = seq_level_idx > 7 && reader.read_bit()?;

        let mut operating_parameters = None;
        if let Some(model) = decoder_model_info {
            if reader.read_bit()? {
                let n = model.buffer_delay_length_minus_1 + 1;
                operating_parameters = Some(OperatingParameters {
                    decoder_buffer_delay: reader.read_bits(n)?,
                    encoder_buffer_delay: reader.read_bits(n)?,
                    low_delay_mode_flag: reader.read_bit()?,
                });
            }
        }

        let initial_display_delay_minus_1 = if initial_display_delay_present && reader.read_bit()? {
            Some(reader.read_bits(4)? as u8)
        } else {
            None
        };

        Ok(Self {
            idc,
            seq_level_idx,
            seq_tier,
            operating_parameters,
            initial_display_delay_minus_1,
        })
    }

    fn mux<W: io::Write>(
        &self,
        writer: &mut BitWriter<W>,
        decoder_model_info: Option<&DecoderModelInfo>,
        initial_display_delay_present: bool,
    ) -> io::Result<()> {
        writer.write_bits(self.idc as u64, 12)?;
        writer.write_bits(self.seq_level_idx as u64, 5)?;
        if self.seq_level_idx > 7 {
            writer.write_bit(self.seq_tier)?;
        }

        if let Some(model) = decoder_model_info {
            writer.write_bit(self.operating_parameters.is_some())?;
            if let Some(params) = &self.operating_parameters {
                let n = model.buffer_delay_length_minus_1 + 1;
                writer.write_bits(params.decoder_buffer_delay, n)?;
                writer.write_bits(params.encoder_buffer_delay, n)?;
                writer.write_bit(params.low_delay_mode_flag)?;
            }
        }

        if initial_display_delay_present {
            writer.write_bit(self.initial_display_delay_minus_1.is_some())?;
            if let Some(delay) = self.initial_display_delay_minus_1 {
                writer.write_bits(delay as u64, 4)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(all(coverage_nightly, test), coverage(off))]
mod tests {
    use super::*;

    /// Sequence header payload of a 3840x2160 main profile stream.
    const UHD_PAYLOAD: &[u8] = b"\0\0\0j\xef\xbf\xe1\xbc\x02\x19\x90\x10\x10\x10@";

    #[test]
    fn test_parse_uhd_header() {
        let header = SequenceHeaderObu::parse(UHD_PAYLOAD).unwrap();

        assert_eq!(header.seq_profile, 0);
        assert_eq!(header.max_frame_width(), 3840);
        assert_eq!(header.max_frame_height(), 2160);
        assert_eq!(header.operating_points.len(), 1);
        assert_eq!(header.operating_points[0].seq_level_idx, 13);
        assert!(header.enable_order_hint);
        assert_eq!(header.order_hint_bits, 7);
        assert_eq!(header.seq_force_screen_content_tools, 0);
        assert_eq!(header.seq_force_integer_mv, SELECT);
        assert!(header.timing_info.is_none());
        assert_eq!(header.frame_rate(), None);

        insta::assert_debug_snapshot!(header.color_config, @r"
        ColorConfig {
            bit_depth: 8,
            mono_chrome: false,
            color_description: Some(
                ColorDescription {
                    color_primaries: 1,
                    transfer_characteristics: 1,
                    matrix_coefficients: 1,
                },
            ),
            full_color_range: false,
            subsampling_x: true,
            subsampling_y: true,
            chroma_sample_position: 0,
            separate_uv_delta_q: false,
        }
        ");
    }

    #[test]
    fn test_mux_reproduces_encoder_bytes() {
        let header = SequenceHeaderObu::parse(UHD_PAYLOAD).unwrap();
        let mut buf = Vec::new();
        let written = header.mux(&mut buf).unwrap();
        assert_eq!(written, UHD_PAYLOAD.len());
        assert_eq!(buf, UHD_PAYLOAD);
    }

    #[test]
    fn test_new_selects_profile() {
        let cases = [
            (ColorConfig::new(8, true, true), 0),
            (ColorConfig::new(10, true, true), 0),
            (ColorConfig::monochrome(8), 0),
            (ColorConfig::new(8, false, false), 1),
            (ColorConfig::new(10, true, false), 2),
            (ColorConfig::new(12, true, true), 2),
        ];

        for (color_config, profile) in cases {
            let header = SequenceHeaderObu::new(640, 480, color_config);
            assert_eq!(header.seq_profile, profile, "{color_config:?}");

            let mut buf = Vec::new();
            header.mux(&mut buf).unwrap();
            let parsed = SequenceHeaderObu::parse(&buf).unwrap();
            assert_eq!(parsed, header, "{color_config:?}");
        }
    }

    #[test]
    fn test_geometry_fields() {
        let header = SequenceHeaderObu::new(640, 480, ColorConfig::new(8, true, true));
        assert_eq!(header.frame_width_bits_minus_1, 9);
        assert_eq!(header.frame_height_bits_minus_1, 8);
        assert_eq!(header.max_frame_width(), 640);
        assert_eq!(header.max_frame_height(), 480);
    }

    #[test]
    fn test_monochrome_flag_survives() {
        let header = SequenceHeaderObu::new(320, 240, ColorConfig::monochrome(10));
        let mut buf = Vec::new();
        header.mux(&mut buf).unwrap();

        let parsed = SequenceHeaderObu::parse(&buf).unwrap();
        assert!(parsed.color_config.mono_chrome);
        assert_eq!(parsed.color_config.bit_depth, 10);
    }

    #[test]
    fn test_timing_info_frame_rate() {
        let mut header = SequenceHeaderObu::new(1920, 1080, ColorConfig::new(8, true, true));
        header.timing_info = Some(TimingInfo {
            num_units_in_display_tick: 1001,
            time_scale: 60000,
            num_ticks_per_picture_minus_1: Some(1),
        });
        header.decoder_model_info = Some(DecoderModelInfo {
            buffer_delay_length_minus_1: 15,
            num_units_in_decoding_tick: 1001,
            buffer_removal_time_length_minus_1: 9,
            frame_presentation_time_length_minus_1: 9,
        });
        header.operating_points[0].operating_parameters = Some(OperatingParameters {
            decoder_buffer_delay: 20000,
            encoder_buffer_delay: 10000,
            low_delay_mode_flag: false,
        });

        let mut buf = Vec::new();
        header.mux(&mut buf).unwrap();
        let parsed = SequenceHeaderObu::parse(&buf).unwrap();
        assert_eq!(parsed, header);

        let fps = parsed.frame_rate().unwrap();
        assert!((fps - 29.97).abs() < 0.001, "{fps}");
    }

    #[test]
    fn test_reserved_profile_rejected() {
        let err = SequenceHeaderObu::parse(&[0b1110_0000, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, Av1Error::InvalidSequenceHeader(_)));
    }

    #[test]
    fn test_truncated_payload() {
        let err = SequenceHeaderObu::parse(&UHD_PAYLOAD[..6]).unwrap_err();
        assert!(matches!(err, Av1Error::Io(_)));
    }
}
