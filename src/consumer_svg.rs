use crate::opt::Category;
use crate::types::Series;
use plotters::prelude::*;
use std::error::Error;
use std::path::Path;

pub fn consume<P: AsRef<Path>>(
    output: &P,
    categories: &[Category],
    series: &[Series],
    samples: usize,
) -> Result<(), Box<dyn Error>> {
    let root = SVGBackend::new(output, (1280, 720 * categories.len() as u32)).into_drawing_area();
    root.fill(&WHITE)?;

    let areas = root.split_evenly((categories.len(), 1));
    let x_max = samples.max(2) - 1;

    for (area, &category) in areas.iter().zip(categories) {
        let group: Vec<&Series> = series.iter().filter(|s| s.category == category).collect();
        let max = group
            .iter()
            .filter_map(|s| s.max())
            .fold(100.0f32, f32::max);

        let mut chart = ChartBuilder::on(area)
            .caption(category.caption(), ("sans-serif", 30).into_font())
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(0..x_max, 0f32..max)?;

        chart
            .configure_mesh()
            .y_label_formatter(&|y| format!("{}°C", y))
            .draw()?;

        for (idx, s) in group.iter().enumerate() {
            let color = Palette99::pick(idx).stroke_width(2).filled();
            let avg = s
                .avg()
                .map_or_else(|| "-".to_string(), |avg| format!("{:.2}°C", avg));
            chart
                .draw_series(LineSeries::new(
                    s.values
                        .iter()
                        .enumerate()
                        .filter_map(|(i, v)| v.map(|v| (i, v))),
                    color.clone(),
                ))?
                .label(format!("{} / AVG({})", &s.label, avg))
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.clone()));
        }

        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}
