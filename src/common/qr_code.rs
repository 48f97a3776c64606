// src/common/qr_code.rs

use base64::Engine;
use image::Luma;
use qrcode::QrCode;

use crate::common::error::AppError;

/// Renderiza o payload EMV do PIX ("copia e cola") como PNG em base64.
/// Usado quando o BTG devolve o EMV sem a imagem do QR Code.
pub fn render_emv_png_base64(emv: &str) -> Result<String, AppError> {
    let code = QrCode::new(emv.as_bytes())
        .map_err(|e| AppError::InternalServerError(anyhow::Error::msg(e.to_string())))?;

    let image_buffer = code.render::<Luma<u8>>().build();
    let dynamic_image = image::DynamicImage::ImageLuma8(image_buffer);

    let mut png = Vec::new();
    dynamic_image
        .write_to(&mut png, image::ImageOutputFormat::Png)
        .map_err(|e| AppError::InternalServerError(anyhow::Error::msg(e.to_string())))?;

    Ok(base64::engine::general_purpose::STANDARD.encode(png))
}
