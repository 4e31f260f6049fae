// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use criterion::*;
use ndarray::Array2;

use lensmock::{ImageGrid, RebinPolicy};

fn rebinning(c: &mut Criterion) {
    // A typical band: 100x100 observed pixels, 1000x1000 super-resolved.
    let super_grid = ImageGrid::from_data(Array2::from_elem((1000, 1000), 1e-3), 10.0, 10.0);

    c.bench_function("rebin integrate 1000x1000 -> 100x100", |b| {
        b.iter(|| super_grid.rebin(100, 100, RebinPolicy::Integrate))
    });

    c.bench_function("rebin mean 1000x1000 -> 100x100", |b| {
        b.iter(|| super_grid.rebin(100, 100, RebinPolicy::Mean))
    });
}

criterion_group!(benches, rebinning);
criterion_main!(benches);
