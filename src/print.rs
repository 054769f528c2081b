// Non-interactive output.
// Writes a remote file annotated with heat buckets, optionally followed by hover text per range.

use std::fmt::Write;
use std::sync::Arc;

use crate::blame::{CancellationToken, Editor, LineRange};
use crate::controller::BlameController;
use crate::workspace::{FileIdentity, GitHubWorkspace};

/// Editor that only remembers which bucket each line landed in.
#[derive(Debug, Default)]
pub struct HeatSheet {
    buckets: Vec<Vec<LineRange>>,
}

impl HeatSheet {
    pub fn bucket_at(&self, line: u32) -> Option<usize> {
        self.buckets
            .iter()
            .position(|ranges| ranges.iter().any(|range| range.line == line))
    }
}

impl Editor for HeatSheet {
    fn set_decorations(&mut self, bucket: usize, ranges: Vec<LineRange>) {
        if self.buckets.len() <= bucket {
            self.buckets.resize_with(bucket + 1, Vec::new);
        }
        self.buckets[bucket] = ranges;
    }
}

/// Fetch, annotate, and print a file.
pub async fn run(
    mut controller: BlameController,
    workspace: Arc<GitHubWorkspace>,
    file: FileIdentity,
    with_hover: bool,
) -> anyhow::Result<()> {
    let cancel = cancel_on_interrupt();
    let contents = workspace.contents(&file).await?;
    let blame = controller
        .fetcher()
        .resolve(&file, Some(&cancel))
        .await?
        .ok_or_else(|| anyhow::anyhow!("blame fetch for {} was cancelled", file))?;

    let mut sheet = HeatSheet::default();
    controller.show(&mut sheet, &file).await;

    let mut hovers = Vec::new();
    if with_hover {
        for range in &blame.ranges {
            let line = range.starting_line.saturating_sub(1);
            if let Some(text) = controller.hover(&file, line, None).await {
                hovers.push((range.starting_line, range.ending_line, text));
            }
        }
    }

    println!(
        "{}/{}/{} @ {}",
        blame.location.owner, blame.location.repo, blame.location.path, blame.revision.name
    );
    print!("{}", annotate(&contents, &sheet, &hovers));
    controller.shutdown();
    Ok(())
}

/// Token cancelled by the first Ctrl-C; a second one exits immediately.
fn cancel_on_interrupt() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling blame fetch");
            token.cancel();
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(130);
            }
        }
    });
    cancel
}

/// Prefix each line with its bucket and number; append hover text per range.
pub fn annotate(contents: &str, sheet: &HeatSheet, hovers: &[(u32, u32, String)]) -> String {
    let mut out = String::new();
    for (i, line) in contents.lines().enumerate() {
        let bucket = u32::try_from(i)
            .ok()
            .and_then(|line| sheet.bucket_at(line))
            .map(|b| format!("{:>2}", b))
            .unwrap_or_else(|| " -".to_string());
        let _ = writeln!(out, "{} {:>6} │ {}", bucket, i + 1, line);
    }

    if !hovers.is_empty() {
        out.push('\n');
        for (start, end, text) in hovers {
            let _ = writeln!(out, "L{}-{}: {}", start, end, text);
        }
    }
    out
}
