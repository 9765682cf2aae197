//! Projectile spawner demo
//!
//! Drives a pool registry from a fixed-step host loop: projectiles are
//! spawned every frame, flown for a random lifetime, then handed back with a
//! delayed destroy. Pass a `.toml` or `.ron` registry config to override
//! the defaults.

use clap::Parser;
use prefab_pool::prelude::*;
use rand::Rng;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const FIXED_STEP: f32 = 1.0 / 60.0;

/// Command line options
#[derive(Debug, Parser)]
#[command(name = "pool_demo", version, about = "Projectile spawner driving a prefab pool registry")]
struct Args {
    /// Registry configuration file (.toml or .ron)
    config: Option<PathBuf>,

    /// Number of fixed steps to simulate
    #[arg(short, long, value_name = "STEPS", default_value_t = 600)]
    steps: u32,
}

/// Gameplay state of a projectile
#[derive(Debug, Clone)]
struct Bullet {
    damage: f32,
    hits: u32,
    armed: bool,
}

impl Component for Bullet {
    fn restore_policy() -> RestorePolicy<Self> {
        RestorePolicy::Fields(vec![
            prefab_pool::restore_field!(Bullet, damage),
            prefab_pool::restore_field!(Bullet, hits),
        ])
    }

    fn reinit_hook() -> Option<fn(&mut Self)> {
        Some(|bullet| bullet.armed = true)
    }

    fn on_teardown(&mut self) {
        self.armed = false;
    }
}

/// Linear and angular motion
#[derive(Debug, Clone)]
struct Body {
    velocity: Vec3,
    angular: f32,
}

impl MotionReset for Body {
    fn reset_motion(&mut self) {
        self.velocity = Vec3::zeros();
        self.angular = 0.0;
    }
}

impl Component for Body {
    fn as_motion_mut(&mut self) -> Option<&mut dyn MotionReset> {
        Some(self)
    }
}

/// Trail glow on the child node
#[derive(Debug, Clone)]
struct Glow {
    intensity: f32,
}

impl Component for Glow {
    fn restore_policy() -> RestorePolicy<Self> {
        RestorePolicy::AllValues
    }
}

fn projectile_template() -> TemplateNode {
    TemplateNode::new("projectile")
        .with_component(Bullet {
            damage: 10.0,
            hits: 0,
            armed: true,
        })
        .with_component(Body {
            velocity: Vec3::zeros(),
            angular: 0.0,
        })
        .with_child(TemplateNode::new("glow").with_component(Glow { intensity: 1.0 }))
}

struct SpawnerApp {
    scene: Scene,
    registry: PoolRegistry,
    clock: Arc<ManualClock>,
    projectile: TemplateId,
    spawned: usize,
}

impl SpawnerApp {
    fn new(config: RegistryConfig) -> Self {
        let mut scene = Scene::new();
        let projectile = scene.add_template(projectile_template());
        let clock = Arc::new(ManualClock::new());
        let registry = PoolRegistry::with_config(config, clock.clone());
        Self {
            scene,
            registry,
            clock,
            projectile,
            spawned: 0,
        }
    }

    fn initialize(&mut self) -> Result<(), PoolError> {
        let warmed = self.registry.apply_prewarm_config(&mut self.scene)?;
        log::info!("Pre-warmed {} pool(s) from configuration", warmed);
        Ok(())
    }

    fn update(&mut self, rng: &mut impl Rng) -> Result<(), PoolError> {
        for _ in 0..rng.gen_range(0..=3) {
            let position = Vec3::new(rng.gen_range(-5.0..5.0), 0.0, rng.gen_range(-5.0..5.0));
            let instance = self
                .registry
                .instantiate(&mut self.scene, self.projectile, &Placement::at(position))?;
            if let Some(body) = self.scene.component_mut::<Body>(instance) {
                body.velocity = Vec3::new(0.0, 0.0, rng.gen_range(5.0..20.0));
                body.angular = rng.gen_range(-1.0..1.0);
            }
            self.registry
                .destroy(&mut self.scene, instance, rng.gen_range(0.2..2.0));
            self.spawned += 1;
        }

        let active: Vec<ObjectId> = self
            .registry
            .pools()
            .flat_map(|pool| pool.active_instances().iter().copied())
            .collect();
        for instance in active {
            if !self.scene.component::<Bullet>(instance).is_some_and(|bullet| bullet.armed) {
                continue;
            }
            let velocity = self
                .scene
                .component::<Body>(instance)
                .map_or_else(Vec3::zeros, |body| body.velocity);
            if let Some(object) = self.scene.object_mut(instance) {
                object.transform.position += velocity * FIXED_STEP;
            }
            self.scene.for_each_component_mut(instance, |component| {
                if let Some(glow) = component.downcast_mut::<Glow>() {
                    glow.intensity *= 0.98;
                }
            });
            if rng.gen_bool(0.01) {
                if let Some(bullet) = self.scene.component_mut::<Bullet>(instance) {
                    bullet.hits += 1;
                    bullet.damage *= 0.5;
                }
            }
        }

        self.clock.advance(FIXED_STEP);
        let report = self.registry.tick(&mut self.scene);
        if report.recycled > 0 {
            log::trace!("Recycled {} projectile(s)", report.recycled);
        }
        Ok(())
    }

    fn run(&mut self, steps: u32) -> Result<(), PoolError> {
        let mut rng = rand::thread_rng();
        for _ in 0..steps {
            self.update(&mut rng)?;
        }
        Ok(())
    }

    fn report(&self) {
        let stats = self.registry.stats();
        log::info!(
            "Spawned {} projectile(s) over {:.1}s: {} created, {} reused, {} active, {} cached, peak {}",
            self.spawned,
            self.clock.now(),
            stats.totals.created,
            stats.totals.reused,
            stats.active,
            stats.cached,
            stats.totals.peak_active
        );
        if stats.totals.shape_mismatches > 0 || stats.totals.misuse_warnings > 0 {
            log::warn!(
                "{} shape mismatch(es), {} misuse warning(s)",
                stats.totals.shape_mismatches,
                stats.totals.misuse_warnings
            );
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<RegistryConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            log::info!("Loading pool configuration from {}", path.display());
            Ok(RegistryConfig::load_from_file(path)?)
        }
        None => {
            let mut config = RegistryConfig::default();
            config.prewarm.insert("projectile".to_string(), 32);
            Ok(config)
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    prefab_pool::foundation::logging::init_with_default("info");
    log::info!("Starting projectile pool demo ({} steps)", args.steps);

    let mut app = SpawnerApp::new(load_config(args.config.as_deref())?);
    app.initialize()?;
    app.run(args.steps)?;
    app.report();

    app.registry.destroy_all(&mut app.scene);
    log::info!("Demo finished");
    Ok(())
}
