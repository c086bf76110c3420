use std::path::PathBuf;

use tokio::time::{sleep, Duration};
use tracing::info;

use crate::audit::read_tail;
use crate::audit::session::ACTIVITY_LOG_FILE;
use crate::cli::commands::LogsArgs;
use crate::errors::ScanError;

pub async fn handle_logs(args: LogsArgs) -> Result<(), ScanError> {
    info!(scan_id = %args.scan_id, "Streaming logs");

    let log_path = PathBuf::from(&args.output)
        .join(&args.scan_id)
        .join(ACTIVITY_LOG_FILE);

    if !log_path.exists() {
        return Err(ScanError::Config(format!(
            "No logs found for scan {}. Path: {}",
            args.scan_id,
            log_path.display()
        )));
    }

    for line in read_tail(&log_path, args.lines).await? {
        println!("{}", line);
    }

    if args.follow {
        let mut offset = tokio::fs::metadata(&log_path).await?.len() as usize;
        loop {
            sleep(Duration::from_secs(1)).await;
            let content = tokio::fs::read(&log_path).await?;
            if let Some((lines, next)) = appended_lines(&content, offset) {
                print!("{}", lines);
                offset = next;
            }
        }
    }

    Ok(())
}

/// Complete lines written after `offset` and the offset just past them. A
/// line still being written waits for the next read; a file that shrank is
/// read again from the start.
fn appended_lines(content: &[u8], offset: usize) -> Option<(String, usize)> {
    let offset = if content.len() < offset { 0 } else { offset };
    let fresh = &content[offset..];
    let end = fresh.iter().rposition(|b| *b == b'\n')? + 1;
    Some((String::from_utf8_lossy(&fresh[..end]).into_owned(), offset + end))
}
