use crate::opt::Category;
use crate::types::Series;
use serde::Serialize;
use std::collections::HashMap;
use std::error::Error;
use std::fs::File;
use std::path::Path;

pub fn consume<P: AsRef<Path>>(
    path: P,
    timestamps: &[chrono::DateTime<chrono::Local>],
    series: &[Series],
) -> Result<(), Box<dyn Error>> {
    let file = File::create(path)?;
    serde_json::to_writer(&file, &build(timestamps, series))?;
    file.sync_all()?;
    Ok(())
}

fn build<'a>(
    timestamps: &[chrono::DateTime<chrono::Local>],
    series: &'a [Series],
) -> JsonOutput<'a> {
    let mut json_output = JsonOutput::default();

    for s in series {
        json_output
            .records
            .entry(s.category)
            .or_default()
            .push(SensorRecord {
                label: &s.label,
                records: timestamps
                    .iter()
                    .zip(&s.values)
                    .map(|(t, &value)| Record {
                        timestamp: t.to_rfc3339(),
                        value,
                    })
                    .collect(),
            });
    }

    json_output
}

#[derive(Serialize)]
struct Record {
    timestamp: String,
    value: Option<f32>,
}

#[derive(Serialize)]
struct SensorRecord<'a> {
    label: &'a str,
    records: Vec<Record>,
}

#[derive(Default, Serialize)]
struct JsonOutput<'a> {
    #[serde(flatten)]
    records: HashMap<Category, Vec<SensorRecord<'a>>>,
}
