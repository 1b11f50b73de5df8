use std::fs;
use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use crate::cli::SplitArgs;
use crate::error::AppError;
use crate::workflows::import::service::entry_file_name;
use crate::workflows::import::split_bundle;

/// Split a bundle on disk and write one PDF per bookmark next to it, without
/// touching any session state. Useful for checking a scan before uploading.
pub(crate) fn run(args: SplitArgs) -> Result<(), AppError> {
    let bytes = fs::read(&args.bundle)?;
    let out_dir = match args.out_dir {
        Some(dir) => dir,
        None => args
            .bundle
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    fs::create_dir_all(&out_dir)?;

    let cancel = CancellationToken::new();
    let outcome = split_bundle(&bytes, &cancel, |progress| {
        println!(
            "[{}/{}] {}",
            progress.completed, progress.total, progress.current_name
        );
    })?;

    for entry in &outcome.entries {
        let file_name = format!("{:04}-{}", entry.first_page, entry_file_name(&entry.name));
        let path = out_dir.join(&file_name);
        fs::write(&path, &entry.pdf)?;
        println!(
            "wrote {} (pages {}-{})",
            path.display(),
            entry.first_page,
            entry.last_page
        );
    }

    for failure in &outcome.failures {
        println!(
            "skipped '{}' at page {}: {}",
            failure.name, failure.page, failure.detail
        );
    }

    println!(
        "\n{} pages split into {} documents, {} bookmarks skipped",
        outcome.page_count,
        outcome.entries.len(),
        outcome.failures.len()
    );

    Ok(())
}
