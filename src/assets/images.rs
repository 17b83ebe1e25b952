// src/assets/images.rs

use std::io::Cursor;

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use tracing::debug;

use crate::assets::{SiteContext, SourceGlob};
use crate::config::AssetPaths;
use crate::task::{ArtifactSet, TaskAction, TaskError, TaskFuture};

/// Copies images into every destination, recompressing PNGs on the way.
#[derive(Debug, Clone)]
pub struct ImageBuild {
    ctx: SiteContext,
    paths: AssetPaths,
}

impl ImageBuild {
    pub fn new(ctx: SiteContext, paths: AssetPaths) -> Self {
        Self { ctx, paths }
    }

    async fn run(&self) -> Result<ArtifactSet, TaskError> {
        let fs = self.ctx.fs.as_ref();
        let sources = SourceGlob::new(&self.paths.src)?.expand(fs, &self.ctx.root)?;

        let mut artifacts = ArtifactSet::new();
        for source in sources {
            let mut bytes = fs.read(&source.path)?;

            let is_png = source
                .path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("png"));
            if is_png {
                let original = bytes.len();
                bytes = tokio::task::spawn_blocking(move || optimize_png(bytes)).await??;
                debug!(
                    task = "build:images",
                    path = %source.relative.display(),
                    before = original,
                    after = bytes.len(),
                    "optimized png"
                );
            }

            for dest in &self.paths.dest {
                let target = self.ctx.resolve(dest).join(&source.relative);
                fs.write(&target, &bytes)?;
                artifacts.push(target);
            }
        }

        Ok(artifacts)
    }
}

impl TaskAction for ImageBuild {
    fn execute(&self) -> TaskFuture<'_> {
        Box::pin(self.run())
    }
}

/// Re-encode a PNG with maximum lossless compression; keep whichever of the
/// two encodings is smaller.
pub fn optimize_png(original: Vec<u8>) -> Result<Vec<u8>, TaskError> {
    let img = image::load_from_memory(&original)?;

    let mut out = Cursor::new(Vec::new());
    let encoder = PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
    img.write_with_encoder(encoder)?;

    let encoded = out.into_inner();
    if encoded.len() < original.len() {
        Ok(encoded)
    } else {
        Ok(original)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::fs::FileSystem;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    fn flat_png() -> Vec<u8> {
        let img = RgbaImage::from_pixel(64, 64, Rgba([10, 20, 30, 255]));
        let mut out = Cursor::new(Vec::new());
        let encoder =
            PngEncoder::new_with_quality(&mut out, CompressionType::Fast, FilterType::NoFilter);
        img.write_with_encoder(encoder).unwrap();
        out.into_inner()
    }

    #[test]
    fn optimized_png_is_never_larger_and_still_decodes() {
        let original = flat_png();
        let optimized = optimize_png(original.clone()).unwrap();

        assert!(optimized.len() <= original.len());
        let decoded = image::load_from_memory_with_format(&optimized, ImageFormat::Png).unwrap();
        assert_eq!(decoded.width(), 64);
    }

    #[tokio::test]
    async fn mirrors_layout_into_every_destination() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("/p/_assets/img/logo.png", flat_png());
        fs.add_file("/p/_assets/img/posts/photo.jpg", "jpeg-bytes");

        let ctx = SiteContext::new("/p", fs.clone());
        let paths = AssetPaths {
            src: "_assets/img/**/*".into(),
            dest: vec![PathBuf::from("assets/img"), PathBuf::from("_site/assets/img")],
        };

        let artifacts = ImageBuild::new(ctx, paths).execute().await.unwrap();

        assert_eq!(artifacts.len(), 4);
        assert_eq!(
            fs.read(Path::new("/p/_site/assets/img/posts/photo.jpg")).unwrap(),
            b"jpeg-bytes"
        );
        assert!(fs.is_file(Path::new("/p/assets/img/logo.png")));
    }
}
