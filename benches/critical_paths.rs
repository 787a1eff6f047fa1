//! Criterion benchmarks for sitepipe critical paths
//!
//! Benchmarks the per-file transforms that run on every rebuild:
//! - CSS: prefixing and dual printing, comment stripping
//! - JS: minification
//! - Images: SVG minification

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sitepipe::transform::css::{process_css, resolve_targets, strip_css_comments};
use sitepipe::transform::images::minify_svg;
use sitepipe::transform::js::minify_script;

// =============================================================================
// Test Data Generators
// =============================================================================

/// Generate a stylesheet with n rules
fn make_stylesheet(rules: usize) -> String {
    (0..rules)
        .map(|i| {
            format!(
                "/* rule {i} */\n.block-{i} {{\n  display: flex;\n  user-select: none;\n  \
                 color: #{:06x};\n  margin: {}px;\n}}\n",
                (i * 7919) % 0xffffff,
                i % 32
            )
        })
        .collect()
}

/// Generate a script with n functions
fn make_script(functions: usize) -> String {
    (0..functions)
        .map(|i| {
            format!(
                "function handler{i}(event) {{\n  var target = event.target;\n  \
                 if (target && target.dataset) {{\n    return target.dataset.value + {i};\n  }}\n  \
                 return null;\n}}\n"
            )
        })
        .collect()
}

/// Generate an SVG with n shapes
fn make_svg(shapes: usize) -> String {
    let body: String = (0..shapes)
        .map(|i| format!("  <!-- shape {i} -->\n  <circle cx=\"{i}\" cy=\"{i}\" r=\"4\"/>\n"))
        .collect();
    format!("<svg xmlns=\"http://www.w3.org/2000/svg\">\n{body}</svg>\n")
}

// =============================================================================
// CSS Benchmarks
// =============================================================================

fn bench_css(c: &mut Criterion) {
    let mut group = c.benchmark_group("css");
    let targets = resolve_targets(&["last 2 versions".to_string(), "safari 8".to_string()])
        .expect("valid browser queries");

    for rules in [10, 100, 1000] {
        let css = make_stylesheet(rules);
        group.throughput(Throughput::Bytes(css.len() as u64));

        group.bench_with_input(BenchmarkId::new("process", rules), &css, |b, css| {
            b.iter(|| process_css(black_box(css), "bench.css", &targets))
        });
        group.bench_with_input(BenchmarkId::new("strip_comments", rules), &css, |b, css| {
            b.iter(|| strip_css_comments(black_box(css)))
        });
    }

    group.finish();
}

// =============================================================================
// JS Benchmarks
// =============================================================================

fn bench_js(c: &mut Criterion) {
    let mut group = c.benchmark_group("js");

    for functions in [10, 100, 1000] {
        let script = make_script(functions);
        group.throughput(Throughput::Bytes(script.len() as u64));
        group.bench_with_input(BenchmarkId::new("minify", functions), &script, |b, script| {
            b.iter(|| minify_script(black_box(script)))
        });
    }

    group.finish();
}

// =============================================================================
// Image Benchmarks
// =============================================================================

fn bench_svg(c: &mut Criterion) {
    let mut group = c.benchmark_group("svg");

    for shapes in [10, 1000] {
        let svg = make_svg(shapes);
        group.throughput(Throughput::Bytes(svg.len() as u64));
        group.bench_with_input(BenchmarkId::new("minify", shapes), &svg, |b, svg| {
            b.iter(|| minify_svg(black_box(svg)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_css, bench_js, bench_svg);
criterion_main!(benches);
