use crate::compute::AggTable;
use anyhow::{bail, Context};
use log::info;
use std::{io::Write, path::Path};

/// Writes `key=min/mean/max/count` for `key` if it is present, or `key=min/mean/max` for every
/// key sorted by key bytes when no key is given. The table must be finalized.
///
/// Keys go out as the raw bytes they were read as, so input that isn't UTF-8 survives.
pub fn write_report(out: &mut impl Write, table: &AggTable, key: Option<&[u8]>) -> std::io::Result<()> {
    match key {
        Some(key) => {
            if let Some(m) = table.get(key) {
                out.write_all(key)?;
                writeln!(
                    out,
                    "={:.1}/{:.1}/{:.1}/{:.1}",
                    m.min, m.mean, m.max, m.count as f64,
                )?;
            }
        }
        None => {
            for (k, m) in table.sorted() {
                out.write_all(k)?;
                writeln!(out, "={:.1}/{:.1}/{:.1}", m.min, m.mean, m.max)?;
            }
        }
    }
    Ok(())
}

/// Checks a rendered report against a golden file.
pub fn compare_expected(output: &[u8], expected: &Path) -> anyhow::Result<()> {
    let expected_output =
        std::fs::read(expected).with_context(|| format!("failed to read {}", expected.display()))?;
    if output != expected_output {
        bail!("output did not match {}", expected.display());
    }
    info!("output matched {}", expected.display());
    Ok(())
}
