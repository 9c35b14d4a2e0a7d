//! Performance benchmarks for rulesmith.
//!
//! This module contains benchmarks for:
//! - Module reference parsing
//! - Candidate search over directory trees of increasing size
//! - Analyzer discovery in modules with large type tables
//!
//! Run with: `cargo bench`

use std::path::Path;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rulesmith::capability::{
    CapabilityScanner, DiagnosticAnalyzer, DiagnosticDescriptor, DiagnosticSeverity, Facet,
    FactoryCatalog, Language, ANALYZER_CONTRACT, ANALYZER_MARKER,
};
use rulesmith::core::TracingLogger;
use rulesmith::module::{
    file_name_from_reference, ModuleHost, ModuleImage, ModuleReference, ModuleResolver, TypeImage,
};

// ============================================================================
// Mock Data Fixtures
// ============================================================================

mod fixtures {
    use super::*;

    struct Noop;

    impl DiagnosticAnalyzer for Noop {
        fn supported_diagnostics(&self) -> Vec<DiagnosticDescriptor> {
            vec![DiagnosticDescriptor::new("BENCH001", "Bench", DiagnosticSeverity::Info)]
        }
    }

    /// Lay out `num_dirs` directories holding `files_per_dir` modules each.
    /// The module named `Target` sits in the last directory.
    pub fn populate_tree(root: &Path, num_dirs: usize, files_per_dir: usize) {
        for d in 0..num_dirs {
            let dir = root.join(format!("pkg_{d:03}")).join("lib");
            std::fs::create_dir_all(&dir).expect("Failed to create package dir");
            for f in 0..files_per_dir {
                let name = format!("Package{d}.Part{f}");
                let image = ModuleImage::new(&name, "1.0.0.0".parse().expect("version"));
                image.write_to(&dir.join(format!("{name}.rmod"))).expect("Failed to write module");
            }
        }

        let last = root.join(format!("pkg_{:03}", num_dirs.saturating_sub(1))).join("lib");
        std::fs::create_dir_all(&last).expect("Failed to create package dir");
        ModuleImage::new("Target", "2.0.0.0".parse().expect("version"))
            .write_to(&last.join("Target.rmod"))
            .expect("Failed to write module");
    }

    /// A module with `num_types` types, every other one a C# analyzer.
    pub fn analyzer_module(num_types: usize) -> ModuleImage {
        let mut image = ModuleImage::new("Bench.Analyzers", "1.0.0.0".parse().expect("version"));
        for i in 0..num_types {
            let ty = TypeImage::class(format!("Bench.Analyzers.Type{i}")).factory("bench::noop");
            let ty = if i % 2 == 0 {
                ty.extends(ANALYZER_CONTRACT).marked(ANALYZER_MARKER, ["C#"])
            } else {
                ty
            };
            image = image.with_type(ty);
        }
        image
    }

    pub fn catalog() -> Arc<FactoryCatalog> {
        let mut catalog = FactoryCatalog::new();
        catalog.register("bench::noop", || Ok(Box::new(Noop) as Box<dyn DiagnosticAnalyzer>));
        Arc::new(catalog)
    }
}

// ============================================================================
// Reference Benchmarks
// ============================================================================

fn bench_reference_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("reference");

    let inputs = [
        ("short", "RoslynAnalyzer11"),
        ("file_name", "Space in Name ByFileName.rmod"),
        ("full", "RoslynAnalyzer11, Version=1.1.0.0, Culture=neutral, PublicKeyToken=null"),
    ];

    for (label, input) in inputs {
        group.bench_with_input(BenchmarkId::new("parse", label), input, |b, input| {
            b.iter(|| black_box(ModuleReference::parse(black_box(input))));
        });
        group.bench_with_input(BenchmarkId::new("file_name", label), input, |b, input| {
            b.iter(|| black_box(file_name_from_reference(black_box(input))));
        });
    }

    group.finish();
}

// ============================================================================
// Resolver Benchmarks
// ============================================================================

fn bench_find_candidates(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolver/find_candidates");

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let reference = ModuleReference::parse("Target, Version=1.0.0.0").expect("reference");

    for (num_dirs, files_per_dir) in [(10, 5), (50, 10), (200, 10)] {
        let root = temp_dir.path().join(format!("tree_{num_dirs}_{files_per_dir}"));
        fixtures::populate_tree(&root, num_dirs, files_per_dir);

        let resolver = ModuleResolver::new(Arc::new(TracingLogger), [&root])
            .expect("Failed to create resolver");

        group.throughput(Throughput::Elements((num_dirs * files_per_dir) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{num_dirs}x{files_per_dir}")),
            &reference,
            |b, reference| {
                b.iter(|| black_box(resolver.find_candidates(black_box(reference))));
            },
        );
    }

    group.finish();
}

// ============================================================================
// Scanner Benchmarks
// ============================================================================

fn bench_descriptor_check(c: &mut Criterion) {
    let descriptor = Language::CSharp.descriptor();
    let image = fixtures::analyzer_module(2);
    let (matching, other) = (&image.types[0], &image.types[1]);

    c.bench_function("descriptor/check_match", |b| {
        b.iter(|| black_box(descriptor.check(black_box(matching))));
    });
    c.bench_function("descriptor/check_reject", |b| {
        b.iter(|| black_box(descriptor.check(black_box(other))));
    });
}

fn bench_discover(c: &mut Criterion) {
    let mut group = c.benchmark_group("scanner/discover");

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");

    for num_types in [10, 100, 500] {
        let path = temp_dir.path().join(format!("Bench{num_types}.rmod"));
        fixtures::analyzer_module(num_types).write_to(&path).expect("Failed to write module");

        let scanner = CapabilityScanner::new(
            ModuleHost::with_probe_dirs(Vec::new()),
            fixtures::catalog(),
            Arc::new(TracingLogger),
        );

        group.throughput(Throughput::Elements(num_types as u64));
        group.bench_with_input(BenchmarkId::new("csharp", num_types), &path, |b, path| {
            b.iter(|| black_box(scanner.discover(Language::CSharp, black_box(&[path]))));
        });
    }

    group.finish();
}

criterion_group!(reference_benches, bench_reference_parsing,);

criterion_group!(resolver_benches, bench_find_candidates,);

criterion_group!(scanner_benches, bench_descriptor_check, bench_discover,);

criterion_main!(reference_benches, resolver_benches, scanner_benches,);
