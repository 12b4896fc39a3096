// ./src/main.rs
use bevy::app::AppExit;
use bevy::log::{LogPlugin, error, info, warn};
use bevy::prelude::{App, EventWriter, MinimalPlugins, Res, Resource, Startup};
use rand::{Rng, SeedableRng, rngs::StdRng};
use sector_navmesh::math::error::NavResult;
use sector_navmesh::prelude::*;

/// Parameter der Demo-Szene
#[derive(Resource, Debug, Clone)]
struct DemoSettings {
    seed: u64,
    hole_count: usize,
    agent_radius: f64,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            seed: 42,
            hole_count: 8,
            agent_radius: 15.0,
        }
    }
}

fn main() {
    App::new()
        .add_plugins((MinimalPlugins, LogPlugin::default()))
        .init_resource::<DemoSettings>()
        .add_systems(Startup, run_demo_system)
        .run();
}

fn run_demo_system(settings: Res<DemoSettings>, mut exit: EventWriter<AppExit>) {
    if let Err(e) = run_demo(&settings) {
        error!("Demo failed: {e}");
    }
    exit.send(AppExit);
}

/// Zwei Sektoren nebeneinander, zufällige Kugel-Löcher, danach einige Pfadabfragen.
fn run_demo(settings: &DemoSettings) -> NavResult<()> {
    let boundary = IntRect::new(IVec2::ZERO, IVec2::splat(1000));
    let mut service = TerrainService::new(NavmeshConfig::default())?;
    let west = service.add_sector(TerrainStaticMetadata::rectangle(boundary), DAffine3::IDENTITY)?;
    let east = service.add_sector(
        TerrainStaticMetadata::rectangle(boundary),
        DAffine3::from_translation(DVec3::new(1000.0, 0.0, 0.0)),
    )?;
    service.connect_sectors(
        west,
        east,
        DoubleLineSegment2::new(Point2D::new(1000.0, 0.0), Point2D::new(1000.0, 1000.0)),
    )?;

    let mut rng = StdRng::seed_from_u64(settings.seed);
    for _ in 0..settings.hole_count {
        let radius = rng.random_range(30.0..90.0);
        let center = DVec3::new(rng.random_range(150.0..1850.0), rng.random_range(150.0..850.0), 0.0);
        let hole = service.create_hole(HoleShape::Sphere { radius }, DAffine3::from_translation(center));
        service.add_temporary_hole(hole)?;
    }

    let snapshot = service.compile_snapshot();
    let network = snapshot
        .overlay_network_manager()
        .compile_terrain_overlay_network(settings.agent_radius)?;
    let summary = network.summary();
    info!(
        "Overlay network: {} nodes, {} edge groups, {} links, {} crossovers",
        summary.nodes, summary.edge_groups, summary.links, summary.crossovers
    );

    let pathfinder = Pathfinder::new();
    let queries = [
        (DVec3::new(50.0, 50.0, 0.0), DVec3::new(1950.0, 950.0, 0.0)),
        (DVec3::new(50.0, 950.0, 0.0), DVec3::new(1950.0, 50.0, 0.0)),
        (DVec3::new(500.0, 500.0, 0.0), DVec3::new(900.0, 100.0, 0.0)),
    ];
    for (from, to) in queries {
        match pathfinder.try_find_path_world(&network, from, to) {
            Some(roadmap) => {
                info!(
                    "Path {from} -> {to}: {:.2} over {} steps through {:?}",
                    roadmap.total_distance,
                    roadmap.steps.len(),
                    roadmap.sectors()
                );
                write_debug_svg(&service, west, settings.agent_radius, &roadmap);
            }
            None => warn!("No path {from} -> {to}"),
        }
    }
    Ok(())
}

/// Schreibt die Sicht des westlichen Sektors samt Route, falls `NAVMESH_DEBUG_SVG` gesetzt ist.
#[cfg(debug_assertions)]
fn write_debug_svg(service: &TerrainService, sector: SectorId, agent_radius: f64, roadmap: &Roadmap) {
    use sector_navmesh::debug::visualization::svg::write_local_geometry_svg;

    let Ok(filename) = std::env::var("NAVMESH_DEBUG_SVG") else {
        return;
    };
    let Ok(manager) = service.view_manager(sector) else {
        return;
    };
    let view = manager.get_view(agent_radius);
    let route: Vec<Point2D> = roadmap
        .steps
        .iter()
        .filter(|s| s.sector == sector)
        .map(|s| s.local)
        .collect();
    if let Err(e) = write_local_geometry_svg(&filename, &view, Some(&route), 1024.0) {
        warn!("Could not write debug SVG: {e}");
    }
}

#[cfg(not(debug_assertions))]
fn write_debug_svg(_service: &TerrainService, _sector: SectorId, _agent_radius: f64, _roadmap: &Roadmap) {}
