//! Assembly of the ordered image list and instruction handed to the synthesis engine.

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageError, RgbaImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::ImageSize;
use crate::selection::Mask;

pub const DEFAULT_PLACEMENT_DIRECTIVE: &str = "Place the content of the reference image into the \
masked region of the first image. Keep every pixel outside the mask exactly as it is.";

pub const PNG_MEDIA_TYPE: &str = "image/png";

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("malformed edit request: {message}")]
    MalformedRequest { message: String },
    #[error("failed to encode {role:?} payload: {source}")]
    Encode {
        role: PayloadRole,
        #[source]
        source: ImageError,
    },
}

pub type ComposeResult<T> = std::result::Result<T, ComposeError>;

fn malformed(message: impl Into<String>) -> ComposeError {
    ComposeError::MalformedRequest {
        message: message.into(),
    }
}

/// Extra image travelling with the primary. References are ordered directly after the
/// primary; everything else follows them.
#[derive(Debug, Clone, PartialEq)]
pub enum AuxiliaryImage {
    Reference(RgbaImage),
    Other(RgbaImage),
}

impl AuxiliaryImage {
    pub fn image(&self) -> &RgbaImage {
        match self {
            Self::Reference(image) | Self::Other(image) => image,
        }
    }

    pub const fn is_reference(&self) -> bool {
        matches!(self, Self::Reference(_))
    }

    const fn role(&self) -> PayloadRole {
        match self {
            Self::Reference(_) => PayloadRole::Reference,
            Self::Other(_) => PayloadRole::Auxiliary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PayloadRole {
    Primary,
    Reference,
    Auxiliary,
    Mask,
}

impl PayloadRole {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Reference => "reference",
            Self::Auxiliary => "auxiliary",
            Self::Mask => "mask",
        }
    }
}

/// Pixel layout of the raster before transport encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PixelFormat {
    Rgba8,
    Luma8,
}

/// How the mask is handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MaskEncoding {
    #[default]
    Luma,
    RgbaAlpha,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub role: PayloadRole,
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub media_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ImagePayload {
    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.width, self.height)
    }
}

/// Immutable, fully ordered request: primary, references, other auxiliaries, mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequest {
    images: Vec<ImagePayload>,
    instruction: String,
}

impl EditRequest {
    pub fn images(&self) -> &[ImagePayload] {
        &self.images
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn primary(&self) -> Option<&ImagePayload> {
        self.images.first()
    }

    pub fn mask(&self) -> Option<&ImagePayload> {
        self.images
            .last()
            .filter(|payload| payload.role == PayloadRole::Mask)
    }

    pub fn roles(&self) -> Vec<PayloadRole> {
        self.images.iter().map(|payload| payload.role).collect()
    }
}

#[derive(Debug, Clone)]
pub struct EditRequestComposer {
    placement_directive: String,
    mask_encoding: MaskEncoding,
}

impl Default for EditRequestComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl EditRequestComposer {
    pub fn new() -> Self {
        Self {
            placement_directive: DEFAULT_PLACEMENT_DIRECTIVE.to_string(),
            mask_encoding: MaskEncoding::default(),
        }
    }

    pub fn with_placement_directive(mut self, directive: impl Into<String>) -> Self {
        let directive = directive.into();
        if !directive.trim().is_empty() {
            self.placement_directive = directive.trim().to_string();
        }
        self
    }

    pub fn with_mask_encoding(mut self, encoding: MaskEncoding) -> Self {
        self.mask_encoding = encoding;
        self
    }

    pub fn placement_directive(&self) -> &str {
        &self.placement_directive
    }

    /// Resolves the engine instruction. Returns `None` when neither text nor a reference
    /// image contributes anything.
    pub fn instruction_text(&self, text: Option<&str>, has_reference: bool) -> Option<String> {
        let text = text.map(str::trim).filter(|text| !text.is_empty());
        match (text, has_reference) {
            (Some(text), false) => Some(text.to_string()),
            (Some(text), true) => Some(format!("{text}\n\n{}", self.placement_directive)),
            (None, true) => Some(self.placement_directive.clone()),
            (None, false) => None,
        }
    }

    pub fn compose(
        &self,
        primary: &RgbaImage,
        auxiliaries: &[AuxiliaryImage],
        mask: &Mask,
        text: Option<&str>,
    ) -> ComposeResult<EditRequest> {
        let primary_size = ImageSize::new(primary.width(), primary.height());
        if primary_size.is_empty() {
            return Err(malformed("primary image is empty"));
        }
        if mask.size() != primary_size {
            return Err(malformed(format!(
                "mask is {}x{} but primary image is {}x{}",
                mask.size().width,
                mask.size().height,
                primary_size.width,
                primary_size.height
            )));
        }
        if let Some(empty) = auxiliaries
            .iter()
            .find(|auxiliary| auxiliary.image().width() == 0 || auxiliary.image().height() == 0)
        {
            return Err(malformed(format!("{:?} image is empty", empty.role())));
        }

        let has_reference = auxiliaries.iter().any(AuxiliaryImage::is_reference);
        let instruction = self
            .instruction_text(text, has_reference)
            .ok_or_else(|| malformed("instruction is empty and no reference image was given"))?;

        let mut images = Vec::with_capacity(auxiliaries.len() + 2);
        images.push(encode_rgba(PayloadRole::Primary, primary)?);
        let references = auxiliaries.iter().filter(|image| image.is_reference());
        let others = auxiliaries.iter().filter(|image| !image.is_reference());
        for auxiliary in references.chain(others) {
            images.push(encode_rgba(auxiliary.role(), auxiliary.image())?);
        }
        images.push(self.encode_mask(mask)?);

        tracing::info!(
            images = images.len(),
            has_reference,
            mask_coverage = mask.coverage(),
            "composed edit request"
        );
        Ok(EditRequest {
            images,
            instruction,
        })
    }

    /// Encodes the mask alone, in the configured mask encoding.
    pub fn encode_mask(&self, mask: &Mask) -> ComposeResult<ImagePayload> {
        match self.mask_encoding {
            MaskEncoding::Luma => {
                let luma = mask.as_luma();
                let bytes = encode_png(
                    PayloadRole::Mask,
                    luma.as_raw(),
                    luma.width(),
                    luma.height(),
                    ExtendedColorType::L8,
                )?;
                Ok(ImagePayload {
                    role: PayloadRole::Mask,
                    format: PixelFormat::Luma8,
                    width: luma.width(),
                    height: luma.height(),
                    media_type: PNG_MEDIA_TYPE,
                    bytes,
                })
            }
            MaskEncoding::RgbaAlpha => encode_rgba(PayloadRole::Mask, &mask.to_rgba()),
        }
    }
}

fn encode_rgba(role: PayloadRole, image: &RgbaImage) -> ComposeResult<ImagePayload> {
    let bytes = encode_png(
        role,
        image.as_raw(),
        image.width(),
        image.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(ImagePayload {
        role,
        format: PixelFormat::Rgba8,
        width: image.width(),
        height: image.height(),
        media_type: PNG_MEDIA_TYPE,
        bytes,
    })
}

fn encode_png(
    role: PayloadRole,
    raw: &[u8],
    width: u32,
    height: u32,
    color: ExtendedColorType,
) -> ComposeResult<Vec<u8>> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(raw, width, height, color)
        .map_err(|source| ComposeError::Encode { role, source })?;
    Ok(bytes)
}
