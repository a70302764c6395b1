use crate::error::Error;
use crate::finder::engine::CellResult;
use std::io;
use std::path::Path;

pub const HEADERS: [&str; 10] = [
    "Cell ID",
    "Status",
    "Matches",
    "Chosen Date",
    "Category",
    "Folder",
    "IMG 0_2",
    "IMG 1_2",
    "Completeness",
    "Copied Folder",
];

fn display(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string()).unwrap_or_default()
}

/// One row per selected candidate; a cell with no match gets one blank row.
pub fn rows(result: &CellResult) -> Vec<[String; 10]> {
    let copied_folder = display(result.copied.first().and_then(|p| p.parent()));
    if result.selected.is_empty() {
        return vec![[
            result.cell_id.clone(),
            result.status.as_str().to_string(),
            result.match_count.to_string(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            copied_folder,
        ]];
    }

    result
        .selected
        .iter()
        .map(|c| {
            [
                result.cell_id.clone(),
                result.status.as_str().to_string(),
                result.match_count.to_string(),
                c.chosen_date().to_string(),
                c.category.to_string(),
                c.folder.display().to_string(),
                display(c.img0.as_deref()),
                display(c.img1.as_deref()),
                c.completeness().as_str().to_string(),
                copied_folder.clone(),
            ]
        })
        .collect()
}

pub fn write_csv_to<W: io::Write>(writer: W, results: &[CellResult]) -> Result<(), Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(HEADERS)?;
    for result in results {
        for row in rows(result) {
            wtr.write_record(&row)?;
        }
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_csv(path: &Path, results: &[CellResult]) -> Result<(), Error> {
    let file = std::fs::File::create(path)?;
    write_csv_to(file, results)
}
