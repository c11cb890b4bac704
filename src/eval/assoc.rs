use memsys_lib::memory::{Memsys, MemsysPolicy};
use memsys_lib::report;
use memsys_lib::run_wrapper::run_trace;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let param_tokens: Vec<String> = std::env::args().collect();
    let trace_path =
        param_tokens.get(1).ok_or("You should specify exactly one trace file")?;

    // Plot line series for each D-cache size
    // For a fixed size, vary the associativity
    // Performance metric: read miss percentage (mode A)
    let cache_sizes: Vec<u64> = vec![4 * 1024, 16 * 1024, 64 * 1024, 256 * 1024];
    let associativities: Vec<usize> = vec![1, 2, 4, 8, 16];

    let mut data: Vec<Vec<(usize, f64)>> = vec![vec![]; cache_sizes.len()];
    let mut y_max: f64 = 0.;
    for (i, cache_size) in cache_sizes.iter().enumerate() {
        for assoc in associativities.iter() {
            let policy = MemsysPolicy {
                dcache_size: *cache_size,
                dcache_assoc: *assoc,
                ..MemsysPolicy::default()
            };
            let mut mem = Memsys::make(policy)?;
            run_trace(&mut mem, Path::new(trace_path))?;
            let dcache = mem.cache("DCACHE").ok_or("mode A has no D-cache")?;
            let miss_perc = 100.0 * dcache.history.read_miss_rate();
            data[i].push((*assoc, miss_perc));
            y_max = y_max.max(miss_perc);
        }
    }

    use plotters::prelude::*;
    use std::path::Path;

    let trace_base_name = String::from(
        trace_path.split('/').last().unwrap_or(trace_path.as_str()),
    );
    let plot_title = format!("D-cache read miss % by associativity: {}", trace_base_name);
    let output_path = report::eval_output_path(
        Path::new("eval"),
        "assoc_eval",
        Path::new(trace_path),
        "svg",
    )?;

    let root = SVGBackend::new(&output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut ctx = ChartBuilder::on(&root)
        .caption(plot_title.as_str(), ("sans-serif", 32).into_font())
        .margin(5)
        .x_label_area_size(40)
        .y_label_area_size(40)
        .build_cartesian_2d(1..16, 0.0..(y_max * 1.1).max(1.0))?;
    ctx.configure_mesh()
        .x_desc("Associativity")
        .y_desc("Read miss %")
        .draw()?;

    for (i, cache_size) in cache_sizes.iter().enumerate() {
        let series = data[i].iter().map(|(x, y)| (*x as i32, *y));
        let label = format!("D-cache size = {}KB", cache_size / 1024);
        let color = Palette99::pick(i).to_rgba();
        ctx.draw_series(LineSeries::new(series, color))?
            .label(label)
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color)
            });
    }

    ctx.configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
