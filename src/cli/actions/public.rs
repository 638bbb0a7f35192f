use super::render::gallery_line;
use crate::{
    api::types::GalleryItem,
    cli::globals::GlobalArgs,
    upload::{self, UploadCandidate},
};
use anyhow::Result;
use std::{io::Write, path::PathBuf};
use tracing::warn;

#[derive(Debug)]
pub struct UploadArgs {
    pub globals: GlobalArgs,
    pub path: PathBuf,
    pub content_type: Option<String>,
}

fn print_gallery(items: &[GalleryItem], out: &mut impl Write) -> Result<()> {
    if items.is_empty() {
        writeln!(out, "No approved pictures yet.")?;
        return Ok(());
    }

    for item in items {
        writeln!(out, "{}", gallery_line(item))?;
    }

    Ok(())
}

/// # Errors
/// Returns an error if the gallery cannot be fetched.
pub async fn gallery(globals: &GlobalArgs) -> Result<()> {
    let items = globals.api()?.gallery().await?;
    print_gallery(&items, &mut std::io::stdout().lock())
}

/// # Errors
/// Returns an error if the file is rejected locally or by the backend, or the
/// storage upload fails.
pub async fn upload(args: UploadArgs) -> Result<()> {
    let file = UploadCandidate::from_path(&args.path, args.content_type.as_deref()).await?;
    let api = args.globals.api()?;
    let session = args.globals.session();

    let submitted = upload::submit(&api, &session, &file).await?;

    let mut out = std::io::stdout().lock();
    writeln!(out, "Uploaded {}. It will appear in the gallery once approved.", file.file_name)?;

    match submitted.gallery {
        Ok(items) => print_gallery(&items, &mut out),
        Err(e) => {
            warn!("gallery reload failed: {e}");
            writeln!(out, "The upload went through, but the gallery could not be reloaded: {e}")?;
            Ok(())
        }
    }
}
