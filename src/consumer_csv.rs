use crate::types::Series;
use std::error::Error;
use std::io;
use std::path::Path;

pub fn consume<P: AsRef<Path>>(
    path: P,
    timestamps: &[chrono::DateTime<chrono::Local>],
    series: &[Series],
) -> Result<(), Box<dyn Error>> {
    let wtr = csv::WriterBuilder::new().flexible(true).from_path(path)?;
    write(wtr, timestamps, series)
}

fn write<W: io::Write>(
    mut wtr: csv::Writer<W>,
    timestamps: &[chrono::DateTime<chrono::Local>],
    series: &[Series],
) -> Result<(), Box<dyn Error>> {
    // Title
    wtr.write_field("Timestamp")?;
    for s in series {
        wtr.write_field(format!("{} ({})", s.category.caption(), &s.label))?;
    }
    wtr.write_record(None::<&[u8]>)?;

    // Data
    for (i, t) in timestamps.iter().enumerate() {
        wtr.write_field(t.to_rfc3339())?;
        for s in series {
            match s.values.get(i).copied().flatten() {
                Some(v) => wtr.write_field(format!("{:.2}", v))?,
                None => wtr.write_field("")?,
            }
        }
        wtr.write_record(None::<&[u8]>)?;
    }

    wtr.flush()?;
    Ok(())
}
