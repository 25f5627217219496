//! Boundary overhead benchmarks
//!
//! Measures the fixed cost of the translation boundary on its success and
//! failure paths, and a full raw-handle create/query/destroy cycle against
//! the checked registry equivalent.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dynet_c_bridge::bail;
use dynet_c_bridge::error::{BridgeError, Status};
use dynet_c_bridge::ffi::dim::{
    dynetCreateDimWithDimensionsAndBatch, dynetDeleteDim, dynetGetDimTotalSize,
};
use dynet_c_bridge::ffi::dim_handle::{
    dynetCreateDimHandle, dynetDeleteDimHandle, dynetGetDimHandleTotalSize,
};
use dynet_c_bridge::translate;

fn bench_translate(c: &mut Criterion) {
    let mut group = c.benchmark_group("translate");

    group.bench_function("success", |b| {
        b.iter(|| translate("bench_ok", || Ok(black_box(()))))
    });

    group.bench_function("failure", |b| {
        b.iter(|| {
            translate("bench_err", || {
                bail!(BridgeError::InvalidArgument(black_box("bench").to_string()))
            })
        })
    });

    group.finish();
}

fn bench_dim_cycle(c: &mut Criterion) {
    let dims = [2u32, 3, 4];
    let mut group = c.benchmark_group("dim_cycle");

    group.bench_function("raw_handle", |b| {
        b.iter(|| unsafe {
            let mut dim = std::ptr::null_mut();
            dynetCreateDimWithDimensionsAndBatch(dims.as_ptr(), dims.len(), 8, &mut dim);
            let mut size = 0u32;
            dynetGetDimTotalSize(dim, &mut size);
            let status = dynetDeleteDim(dim);
            black_box((size, status))
        })
    });

    group.bench_function("checked_handle", |b| {
        b.iter(|| unsafe {
            let mut handle = 0u64;
            dynetCreateDimHandle(dims.as_ptr(), dims.len(), 8, &mut handle);
            let mut size = 0u32;
            dynetGetDimHandleTotalSize(handle, &mut size);
            let status: Status = dynetDeleteDimHandle(handle);
            black_box((size, status))
        })
    });

    group.finish();
}

criterion_group!(benches, bench_translate, bench_dim_cycle);
criterion_main!(benches);
