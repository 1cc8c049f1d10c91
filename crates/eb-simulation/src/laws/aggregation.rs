use std::collections::HashMap;

use eb_core::component::{Body, ElementCounts, MaterialBody, union_counts};
use eb_core::conserved::ConservedQuantities;
use eb_core::entity::{Capability, Entity, EntityId, Physical, Scale};
use glam::DVec3;
use serde::Deserialize;

use crate::context::SimContext;
use crate::error::SimResult;
use crate::event::SimEventKind;
use crate::system::System;

/// Configuration for [`AggregationSystem`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Simulated seconds between aggregation passes.
    pub threshold: f64,
    /// Members must be strictly closer than this to the cluster seed.
    pub proximity: f64,
    /// Smallest cluster that forms an aggregate.
    pub min_cluster_size: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            threshold: 1.0,
            proximity: 2.0,
            min_cluster_size: 2,
        }
    }
}

/// The composite an aggregation pass would create from a cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatePlan {
    /// Cluster members in insertion order.
    pub members: Vec<EntityId>,
    /// Summed quantities of the members.
    pub child_totals: ConservedQuantities,
    /// Quantities the aggregate would carry.
    pub aggregate_totals: ConservedQuantities,
    /// Mass-weighted centre, or the plain mean when the cluster is massless.
    pub position: DVec3,
    /// Mass-weighted average velocity.
    pub velocity: DVec3,
    /// Union of the members' element counts.
    pub element_counts: ElementCounts,
    /// Mean temperature of the members that have one.
    pub temperature: Option<f64>,
}

impl AggregatePlan {
    /// Plan the aggregate for a cluster.
    pub fn from_members(members: &[&Entity]) -> Self {
        let child_totals: ConservedQuantities =
            members.iter().map(|e| ConservedQuantities::of(e)).sum();
        let mass = child_totals.mass;
        let n = members.len().max(1) as f64;

        let (position, velocity) = if mass > 0.0 {
            let weighted: DVec3 = members
                .iter()
                .map(|e| e.position() * e.physical.mass)
                .sum();
            (weighted / mass, child_totals.momentum / mass)
        } else {
            let mean: DVec3 = members.iter().map(|e| e.position()).sum();
            (mean / n, DVec3::ZERO)
        };

        let aggregate_totals = ConservedQuantities::new(
            mass,
            child_totals.energy,
            child_totals.charge,
            velocity * mass,
        );

        let element_counts = members
            .iter()
            .filter_map(|e| e.body.element_counts())
            .fold(ElementCounts::new(), |acc, c| union_counts(&acc, c));

        let temps: Vec<f64> = members.iter().filter_map(|e| e.physical.temperature).collect();
        let temperature =
            (!temps.is_empty()).then(|| temps.iter().sum::<f64>() / temps.len() as f64);

        Self {
            members: members.iter().map(|e| e.id).collect(),
            child_totals,
            aggregate_totals,
            position,
            velocity,
            element_counts,
            temperature,
        }
    }

    fn into_entity(self, id: EntityId) -> Entity {
        let physical = Physical {
            mass: self.aggregate_totals.mass,
            charge: self.aggregate_totals.charge,
            temperature: self.temperature,
            position: self.position,
            velocity: Some(self.velocity),
        };
        let body = Body::Material(MaterialBody {
            aggregate_of: self.members,
            conserved_energy: self.aggregate_totals.energy,
            element_counts: self.element_counts,
        });
        Entity::with_id(id, physical, body)
    }
}

/// Periodically merges nearby molecules into material aggregates.
#[derive(Debug, Default)]
pub struct AggregationSystem {
    config: AggregationConfig,
    since_last_pass: f64,
}

impl AggregationSystem {
    /// A system that has not accumulated any time yet.
    pub fn new(config: AggregationConfig) -> Self {
        Self {
            config,
            since_last_pass: 0.0,
        }
    }

    /// Candidate clusters in seed order.
    ///
    /// Each active molecule seeds a cluster of the later molecules strictly
    /// within `proximity` of it. Clusters may overlap.
    pub fn find_clusters(&self, ctx: &SimContext<'_>) -> Vec<Vec<EntityId>> {
        let molecules = ctx
            .world
            .query()
            .scales(self.scales())
            .active()
            .ids();
        let rank: HashMap<EntityId, usize> =
            molecules.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let limit = self.config.proximity * self.config.proximity;

        let mut clusters = Vec::new();
        for (i, &seed) in molecules.iter().enumerate() {
            let Some(center) = ctx.world.get_entity(seed).map(Entity::position) else {
                continue;
            };
            let mut near: Vec<(usize, EntityId)> = ctx
                .index
                .query_radius(center, self.config.proximity)
                .into_iter()
                .filter_map(|id| rank.get(&id).map(|r| (*r, id)))
                .filter(|(r, id)| {
                    *r > i
                        && ctx
                            .index
                            .position_of(*id)
                            .is_some_and(|p| p.distance_squared(center) < limit)
                })
                .collect();
            near.sort_unstable();

            let mut cluster = vec![seed];
            cluster.extend(near.into_iter().map(|(_, id)| id));
            if cluster.len() >= self.config.min_cluster_size {
                clusters.push(cluster);
            }
        }
        clusters
    }

    /// Run one aggregation pass now. Returns the IDs of new aggregates.
    pub fn aggregate(&self, ctx: &mut SimContext<'_>) -> SimResult<Vec<EntityId>> {
        let mut created = Vec::new();
        for cluster in self.find_clusters(ctx) {
            let plan = {
                let members: Vec<&Entity> = cluster
                    .iter()
                    .filter_map(|id| ctx.world.get_entity(*id))
                    .filter(|e| e.is_active())
                    .collect();
                if members.len() < self.config.min_cluster_size.max(2) {
                    continue;
                }
                AggregatePlan::from_members(&members)
            };

            let reason = format!("aggregate of {} molecules", plan.members.len());
            if !ctx.ledger.validate_aggregation(
                &plan.members,
                &plan.child_totals,
                &plan.aggregate_totals,
                &reason,
            ) {
                ctx.emit(
                    SimEventKind::ConservationViolated {
                        entities: plan.members.clone(),
                        reason,
                    },
                    "aggregation rejected",
                );
                continue;
            }

            let members = plan.members.clone();
            let id = ctx.new_id();
            let aggregate = ctx.spawn(plan.into_entity(id))?;
            for member in &members {
                ctx.consume(*member, aggregate)?;
            }
            tracing::debug!(%aggregate, members = members.len(), "aggregate formed");
            ctx.emit(
                SimEventKind::Aggregated {
                    aggregate,
                    members: members.clone(),
                },
                format!("{} molecules merged into {aggregate}", members.len()),
            );
            created.push(aggregate);
        }
        Ok(created)
    }
}

impl System for AggregationSystem {
    fn name(&self) -> &str {
        "aggregation"
    }

    fn scales(&self) -> &[Scale] {
        &[Scale::Molecular]
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::Chemistry]
    }

    fn update(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        self.since_last_pass += ctx.dt;
        if self.since_last_pass < self.config.threshold {
            return Ok(());
        }
        self.since_last_pass = 0.0;
        self.aggregate(ctx)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
