#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for the urban guardian core.
//!
//! Reads a JSON array of incidents (the store's row shape), runs one of the
//! core computations over it and prints the result as JSON. Engine settings
//! come from [`EngineConfig::load`]; set `RUST_LOG` for diagnostics.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use urban_guardian_alerts::{Alert, ProximityDecision};
use urban_guardian_analytics::{AreaAnalytics, TypeAnalytics, area_analytics, type_breakdown};
use urban_guardian_cluster::{
    Cluster, ClusterSizeTier, Hotspot, compute_clusters_with, rank_hotspots,
};
use urban_guardian_config::EngineConfig;
use urban_guardian_geo::{LatLng, distance_km};
use urban_guardian_heatmap::{project_clusters, to_geojson};
use urban_guardian_incident_models::{Incident, IncidentId, ingest::NewIncident};

#[derive(Parser)]
#[command(name = "urban_guardian", about = "Incident clustering, heatmap and alert tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InputArgs {
    /// JSON file holding an array of incidents
    #[arg(long)]
    input: PathBuf,
    /// Evaluate recency as of this RFC 3339 instant instead of now
    #[arg(long)]
    now: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Cluster incidents and print a summary of each cluster
    Clusters {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Print the largest multi-incident clusters
    Hotspots {
        #[command(flatten)]
        input: InputArgs,
        /// How many hotspots to print (defaults to the configured limit)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print heat samples for a density map
    Heatmap {
        #[command(flatten)]
        input: InputArgs,
        /// Emit a `GeoJSON` feature collection instead of plain samples
        #[arg(long)]
        geojson: bool,
    },
    /// Print type breakdown, recent trends and hotspots
    Analytics {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Decide which incidents a user at the given position should hear about
    Proximity {
        #[command(flatten)]
        input: InputArgs,
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
    },
    /// Validate a submitted report and print the incident it would create
    Report {
        /// JSON file holding one report (`type`, `lat`, `lng`, ...)
        #[arg(long)]
        input: PathBuf,
        /// Id to assign to the new incident
        #[arg(long)]
        id: IncidentId,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClusterSummary {
    center: LatLng,
    count: usize,
    total_intensity: f64,
    dominant_type: String,
    size_tier: ClusterSizeTier,
    member_ids: Vec<IncidentId>,
}

impl From<&Cluster> for ClusterSummary {
    fn from(cluster: &Cluster) -> Self {
        Self {
            center: cluster.center,
            count: cluster.count(),
            total_intensity: cluster.total_intensity,
            dominant_type: cluster.dominant_type.clone(),
            size_tier: cluster.size_tier(),
            member_ids: cluster.members.iter().map(|m| m.id).collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProximityReport {
    incident_id: IncidentId,
    #[serde(flatten)]
    decision: ProximityDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<String>,
}

#[derive(Serialize)]
struct AnalyticsReport {
    types: TypeAnalytics,
    areas: AreaAnalytics,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();
    let config = EngineConfig::load()?;

    match cli.command {
        Commands::Clusters { input } => {
            let (incidents, now) = input.load()?;
            let clusters = cluster(&config, &incidents, now);
            let summaries: Vec<ClusterSummary> =
                clusters.iter().map(ClusterSummary::from).collect();
            print_json(&summaries)?;
        }
        Commands::Hotspots { input, limit } => {
            let (incidents, now) = input.load()?;
            let clusters = cluster(&config, &incidents, now);
            let limit = limit.unwrap_or(config.clustering.hotspot_limit);
            let hotspots: Vec<Hotspot> = rank_hotspots(&clusters, limit)
                .iter()
                .map(Hotspot::from)
                .collect();
            print_json(&hotspots)?;
        }
        Commands::Heatmap { input, geojson } => {
            let (incidents, now) = input.load()?;
            let samples = project_clusters(&cluster(&config, &incidents, now));
            if geojson {
                print_json(&to_geojson(&samples))?;
            } else {
                print_json(&samples)?;
            }
        }
        Commands::Analytics { input } => {
            let (incidents, now) = input.load()?;
            print_json(&AnalyticsReport {
                types: type_breakdown(&incidents),
                areas: area_analytics(
                    &incidents,
                    now,
                    config.clustering.radius,
                    config.clustering.hotspot_limit,
                ),
            })?;
        }
        Commands::Proximity { input, lat, lng } => {
            let (incidents, _) = input.load()?;
            let user = LatLng::validated(lat, lng)?;
            print_json(&proximity_reports(
                user,
                &incidents,
                config.alerts.notify_radius_km,
            ))?;
        }
        Commands::Report { input, id } => {
            let report: NewIncident = serde_json::from_str(&read(&input)?)?;
            let incident = report.validate(id, Utc::now())?;
            log::info!("Report accepted as incident {id}");
            print_json(&incident)?;
        }
    }

    Ok(())
}

impl InputArgs {
    fn load(&self) -> Result<(Vec<Incident>, DateTime<Utc>), Box<dyn std::error::Error>> {
        let incidents: Vec<Incident> = serde_json::from_str(&read(&self.input)?)?;
        log::debug!(
            "Read {} incidents from {}",
            incidents.len(),
            self.input.display()
        );
        let now = match &self.now {
            Some(value) => DateTime::parse_from_rfc3339(value)
                .map_err(|e| format!("Invalid --now {value:?}: {e}"))?
                .with_timezone(&Utc),
            None => Utc::now(),
        };
        Ok((incidents, now))
    }
}

fn read(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()).into())
}

fn cluster(config: &EngineConfig, incidents: &[Incident], now: DateTime<Utc>) -> Vec<Cluster> {
    compute_clusters_with(config.strategy(), incidents, now, config.clustering.radius)
}

fn proximity_reports(user: LatLng, incidents: &[Incident], radius_km: f64) -> Vec<ProximityReport> {
    incidents
        .iter()
        .map(|incident| {
            let decision =
                ProximityDecision::with_radius(distance_km(user, incident.position), radius_km);
            let (title, body) = if decision.notify {
                let alert = Alert::new(incident, decision.distance_km);
                (Some(alert.title), Some(alert.body))
            } else {
                (None, None)
            };
            ProximityReport {
                incident_id: incident.id,
                decision,
                title,
                body,
            }
        })
        .collect()
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
