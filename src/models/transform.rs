use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use super::errors::AppError;

pub const MAX_DIMENSION: u32 = 4000;
pub const MAX_CHAIN_STEPS: usize = 16;
pub const MAX_FONT_SIZE: u32 = 200;
pub const MAX_TEXT_LEN: usize = 40;
pub const BLUR_STRENGTH: u32 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    ArtAudrey,
    ArtZorro,
    Blur(u32),
    Cartoonify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeMode {
    Crop,
    Fill,
}

/// One step of a delivery-time image transformation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transformation {
    Thumb { width: u32, height: u32 },
    RoundMax,
    Effect(Effect),
    Resize { mode: ResizeMode, width: u32, height: u32 },
    Fill { width: u32, height: u32 },
    Text { size: u32, text: String },
    Scale { width: u32 },
    FlipVertical,
    Rotate { degrees: i32 },
}

impl fmt::Display for Transformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transformation::Thumb { width, height } => {
                write!(f, "c_thumb,g_face,h_{},w_{}", height, width)
            }
            Transformation::RoundMax => f.write_str("r_max"),
            Transformation::Effect(effect) => match effect {
                Effect::ArtAudrey => f.write_str("e_art:audrey"),
                Effect::ArtZorro => f.write_str("e_art:zorro"),
                Effect::Blur(strength) => write!(f, "e_blur:{}", strength),
                Effect::Cartoonify => f.write_str("e_cartoonify"),
            },
            Transformation::Resize { mode, width, height } => {
                let mode = match mode {
                    ResizeMode::Crop => "crop",
                    ResizeMode::Fill => "fill",
                };
                write!(f, "c_{},g_auto,h_{},w_{}", mode, height, width)
            }
            Transformation::Fill { width, height } => write!(f, "c_fill,h_{},w_{}", height, width),
            Transformation::Text { size, text } => {
                write!(f, "co_yellow,g_south,l_text:{}:{},y_20", size, text)
            }
            Transformation::Scale { width } => write!(f, "c_scale,w_{}", width),
            Transformation::FlipVertical => f.write_str("a_vflip"),
            Transformation::Rotate { degrees } => write!(f, "a_{}", degrees),
        }
    }
}

impl FromStr for Transformation {
    type Err = AppError;

    fn from_str(segment: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::bad_request(format!("Invalid transformation: {}", segment));

        let mut params: Vec<(&str, &str)> = Vec::new();
        for part in segment.split(',') {
            params.push(part.split_once('_').ok_or_else(invalid)?);
        }
        let param = |key: &str| params.iter().find(|(k, _)| *k == key).map(|(_, v)| *v);
        let dimension = |key: &str| -> Result<u32, AppError> {
            let value = param(key).ok_or_else(invalid)?;
            parse_dimension(value).ok_or_else(invalid)
        };

        if let Some(layer) = param("l") {
            let (size, text) = layer
                .strip_prefix("text:")
                .and_then(|rest| rest.split_once(':'))
                .ok_or_else(invalid)?;
            let size: u32 = size.parse().map_err(|_| invalid())?;
            validate_text(size, text).map_err(|_| invalid())?;
            return Ok(Transformation::Text { size, text: text.to_string() });
        }

        if let Some(crop) = param("c") {
            return match (crop, param("g")) {
                ("thumb", _) => Ok(Transformation::Thumb {
                    width: dimension("w")?,
                    height: dimension("h")?,
                }),
                ("crop", Some("auto")) => Ok(Transformation::Resize {
                    mode: ResizeMode::Crop,
                    width: dimension("w")?,
                    height: dimension("h")?,
                }),
                ("fill", Some("auto")) => Ok(Transformation::Resize {
                    mode: ResizeMode::Fill,
                    width: dimension("w")?,
                    height: dimension("h")?,
                }),
                ("fill", None) => Ok(Transformation::Fill {
                    width: dimension("w")?,
                    height: dimension("h")?,
                }),
                ("scale", _) => Ok(Transformation::Scale { width: dimension("w")? }),
                _ => Err(invalid()),
            };
        }

        if params.len() != 1 {
            return Err(invalid());
        }

        match params[0] {
            ("r", "max") => Ok(Transformation::RoundMax),
            ("a", "vflip") => Ok(Transformation::FlipVertical),
            ("a", degrees) => {
                let degrees: i32 = degrees.parse().map_err(|_| invalid())?;
                if degrees.abs() > 360 {
                    return Err(invalid());
                }
                Ok(Transformation::Rotate { degrees })
            }
            ("e", "art:audrey") => Ok(Transformation::Effect(Effect::ArtAudrey)),
            ("e", "art:zorro") => Ok(Transformation::Effect(Effect::ArtZorro)),
            ("e", "cartoonify") => Ok(Transformation::Effect(Effect::Cartoonify)),
            ("e", blur) => {
                let strength: u32 = blur
                    .strip_prefix("blur:")
                    .and_then(|s| s.parse().ok())
                    .filter(|s| (1..=2000).contains(s))
                    .ok_or_else(invalid)?;
                Ok(Transformation::Effect(Effect::Blur(strength)))
            }
            _ => Err(invalid()),
        }
    }
}

/// Ordered list of transformations, rendered as `/`-joined segments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformChain(pub Vec<Transformation>);

impl TransformChain {
    /// The 250x250 fill used for foto previews and avatars
    pub fn preview() -> Self {
        TransformChain(vec![Transformation::Fill { width: 250, height: 250 }])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn steps(&self) -> &[Transformation] {
        &self.0
    }
}

impl fmt::Display for TransformChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}

impl FromStr for TransformChain {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(TransformChain::default());
        }
        if s.split('/').count() > MAX_CHAIN_STEPS {
            return Err(AppError::bad_request(format!(
                "A transformation chain has at most {} steps",
                MAX_CHAIN_STEPS
            )));
        }
        s.split('/')
            .map(Transformation::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map(TransformChain)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CircleParams {
    pub use_filter: bool,
    pub height: u32,
    pub width: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EffectParams {
    pub use_filter: bool,
    pub art_audrey: bool,
    pub art_zorro: bool,
    pub cartoonify: bool,
    pub blur: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResizeParams {
    pub use_filter: bool,
    pub crop: bool,
    pub fill: bool,
    pub height: u32,
    pub width: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TextParams {
    pub use_filter: bool,
    pub font_size: u32,
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RotateParams {
    pub use_filter: bool,
    pub width: u32,
    pub degree: i32,
}

/// Transformation request for a stored foto
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TransformBody {
    pub circle: CircleParams,
    pub effect: EffectParams,
    pub resize: ResizeParams,
    pub text: TextParams,
    pub rotate: RotateParams,
}

impl TransformBody {
    pub fn validate(&self) -> Result<(), AppError> {
        for (name, value) in [
            ("circle.height", self.circle.height),
            ("circle.width", self.circle.width),
            ("resize.height", self.resize.height),
            ("resize.width", self.resize.width),
            ("rotate.width", self.rotate.width),
        ] {
            if value > MAX_DIMENSION {
                return Err(AppError::validation_failed(format!(
                    "{} must be at most {}",
                    name, MAX_DIMENSION
                )));
            }
        }

        if self.rotate.degree.abs() > 360 {
            return Err(AppError::validation_failed(
                "rotate.degree must be between -360 and 360",
            ));
        }

        if self.text.use_filter && (self.text.font_size > 0 || !self.text.text.is_empty()) {
            validate_text(self.text.font_size, &self.text.text)?;
        }

        Ok(())
    }

    /// Builds the chain in circle, effect, resize, text, rotate order
    pub fn to_chain(&self) -> Result<TransformChain, AppError> {
        self.validate()?;
        let mut steps = Vec::new();

        let circle = &self.circle;
        if circle.use_filter && circle.height > 0 && circle.width > 0 {
            steps.push(Transformation::Thumb {
                width: circle.width,
                height: circle.height,
            });
            steps.push(Transformation::RoundMax);
        }

        let effect = &self.effect;
        if effect.use_filter {
            let mut chosen = None;
            if effect.art_audrey {
                chosen = Some(Effect::ArtAudrey);
            }
            if effect.art_zorro {
                chosen = Some(Effect::ArtZorro);
            }
            if effect.blur {
                chosen = Some(Effect::Blur(BLUR_STRENGTH));
            }
            if effect.cartoonify {
                chosen = Some(Effect::Cartoonify);
            }
            if let Some(effect) = chosen {
                steps.push(Transformation::Effect(effect));
            }
        }

        let resize = &self.resize;
        if resize.use_filter && resize.height > 0 && resize.width > 0 {
            let mode = if resize.fill {
                Some(ResizeMode::Fill)
            } else if resize.crop {
                Some(ResizeMode::Crop)
            } else {
                None
            };
            if let Some(mode) = mode {
                steps.push(Transformation::Resize {
                    mode,
                    width: resize.width,
                    height: resize.height,
                });
            }
        }

        let text = &self.text;
        if text.use_filter && text.font_size > 0 && !text.text.is_empty() {
            steps.push(Transformation::Text {
                size: text.font_size,
                text: text.text.clone(),
            });
        }

        let rotate = &self.rotate;
        if rotate.use_filter && rotate.width > 0 && rotate.degree != 0 {
            steps.push(Transformation::Scale { width: rotate.width });
            steps.push(Transformation::FlipVertical);
            steps.push(Transformation::Rotate {
                degrees: rotate.degree,
            });
        }

        Ok(TransformChain(steps))
    }
}

fn parse_dimension(value: &str) -> Option<u32> {
    value
        .parse::<u32>()
        .ok()
        .filter(|v| (1..=MAX_DIMENSION).contains(v))
}

fn validate_text(size: u32, text: &str) -> Result<(), AppError> {
    if !(1..=MAX_FONT_SIZE).contains(&size) {
        return Err(AppError::validation_failed(format!(
            "text.font_size must be between 1 and {}",
            MAX_FONT_SIZE
        )));
    }
    let len = text.chars().count();
    if !(1..=MAX_TEXT_LEN).contains(&len) {
        return Err(AppError::validation_failed(format!(
            "text.text must be between 1 and {} characters",
            MAX_TEXT_LEN
        )));
    }
    if !text
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '.' | '!' | '?' | '-'))
    {
        return Err(AppError::validation_failed(
            "text.text may only contain letters, digits, spaces and . ! ? -",
        ));
    }
    Ok(())
}
