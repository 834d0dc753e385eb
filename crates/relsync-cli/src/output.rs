use relsync_core::sync::SyncReport;
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let header_row: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_row.join("  ").trim_end());

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = w)
            })
            .collect();
        println!("{}", cells.join("  ").trim_end());
    }
}

/// One row per release: synced, up to date, or failed.
pub fn print_sync_report(report: &SyncReport, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(report);
    }
    if report.total() == 0 {
        println!("Nothing to sync.");
        return Ok(());
    }

    let mut rows = Vec::with_capacity(report.total());
    for s in &report.synced {
        let detail = s
            .link_path
            .clone()
            .or_else(|| s.artifact_path.clone())
            .unwrap_or_default();
        rows.push(vec![s.repo.clone(), "synced".into(), s.version.clone(), detail]);
    }
    for repo in &report.up_to_date {
        rows.push(vec![repo.clone(), "up-to-date".into(), String::new(), String::new()]);
    }
    for f in &report.errors {
        rows.push(vec![f.repo.clone(), "error".into(), String::new(), f.error.clone()]);
    }
    print_table(&["REPO", "STATUS", "VERSION", "DETAIL"], rows);
    Ok(())
}
