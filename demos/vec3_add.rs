//! Element-wise addition of 3-component vectors on the GPU and the CPU.
//!
//! Run this demo with:
//!
//! ```sh
//! RUST_LOG=info cargo run --example vec3_add
//! ```
//!
//! Adds a small pair of arrays and prints the sum, then times both paths
//! on growing inputs.  `WGPU_BACKEND` and `WGPU_POWER_PREF` pick the
//! adapter.

use std::time::Instant;

use rand::Rng;
use wgpu_vec3_add::{
    ContextOptions, CpuBackend, GpuBackend, KernelConfig, Vec3, Vec3AddBackend,
};

fn random_vecs(n: usize) -> Vec<Vec3> {
    let mut rng = rand::thread_rng();
    (0..n)
        .map(|_| Vec3::new(rng.gen(), rng.gen(), rng.gen()))
        .collect()
}

fn main() -> wgpu_vec3_add::Result<()> {
    env_logger::init();
    let config = KernelConfig::default();
    let gpu = GpuBackend::new(&ContextOptions::from_env(), &config)?;
    let cpu = CpuBackend::new(config);

    let a = [Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.0, 0.0, 0.0)];
    let b = [Vec3::new(4.0, 5.0, 6.0), Vec3::new(1.0, 1.0, 1.0)];
    println!("Result: {:?}", gpu.add(&a, &b)?);

    println!("Vec3 addition on GPU vs CPU (GPU times include data transfer)");
    for n in [1_usize, 1_000, 100_000, 1_000_000, 5_000_000] {
        let a = random_vecs(n);
        let b = random_vecs(n);

        let start = Instant::now();
        let cpu_out = cpu.add(&a, &b)?;
        let cpu_time = start.elapsed();

        let start = Instant::now();
        let gpu_out = gpu.add(&a, &b)?;
        let gpu_time = start.elapsed();

        assert_eq!(cpu_out, gpu_out, "backends disagree at n = {n}");
        println!("n = {n:>9}: CPU = {cpu_time:?}, GPU = {gpu_time:?}");
    }
    Ok(())
}
