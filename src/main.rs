use rustoffload::{DepthSort, SchedulerConfig, SortPayload, WorkerEvent, initialize_workers};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

const EMITTERS: usize = 8;
const PARTICLES_PER_EMITTER: usize = 4096;
const FRAMES: usize = 60;

fn load_config() -> Result<SchedulerConfig, Box<dyn std::error::Error>> {
    match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&text)?)
        }
        None => Ok(SchedulerConfig::with_default_workers()),
    }
}

/// Distance of every particle of an emitter from a camera orbiting the scene.
fn particle_distances(emitter: usize, frame: usize) -> Vec<f32> {
    let camera = frame as f32 * 0.05;
    (0..PARTICLES_PER_EMITTER)
        .map(|i| {
            let phase = (i * 31 + emitter * 17) as f32 * 0.01;
            ((phase + camera).sin() * 50.0 + emitter as f32).abs()
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("RustOffload - Frame-Scoped Job Offload Scheduler\n");

    let config = load_config()?;
    let mut scheduler = initialize_workers(&config, DepthSort)?;
    println!("Initialized {} worker threads", scheduler.num_workers());

    scheduler.events_mut().once(WorkerEvent::InitComplete, || {
        println!("  All workers acknowledged readiness");
    });

    let draw_orders: Rc<RefCell<Vec<Vec<u32>>>> =
        Rc::new(RefCell::new(vec![Vec::new(); EMITTERS]));
    let rendered = Rc::new(Cell::new(0usize));

    let start = Instant::now();
    for frame in 0..FRAMES {
        // Update: every emitter offloads its depth sort.
        for emitter in 0..EMITTERS {
            let draw_orders = draw_orders.clone();
            scheduler.submit(
                SortPayload::new(particle_distances(emitter, frame)),
                move |sorted| draw_orders.borrow_mut()[emitter] = sorted.order,
            )?;
        }

        // Render continues once this frame's sorts are back.
        let rendered_clone = rendered.clone();
        scheduler.on_frame_sync(move || rendered_clone.set(rendered_clone.get() + 1));

        while rendered.get() <= frame {
            scheduler.poll_timeout(Duration::from_millis(1));
        }
    }
    let duration = start.elapsed();

    let stats = scheduler.stats();
    println!("Rendered {} frames in {:?}", rendered.get(), duration);
    println!(
        "  Jobs completed: {} ({:.0} jobs/second)",
        stats.jobs_completed,
        stats.jobs_per_second()
    );
    println!(
        "  Frames that waited on workers: {:.0}%",
        stats.deferred_ratio() * 100.0
    );
    println!(
        "  Nearest particle of emitter 0: {:?}\n",
        draw_orders.borrow()[0].first()
    );

    println!("Shutting down scheduler...");
    scheduler.shutdown()?;
    println!("Done!");
    Ok(())
}
