use eb_core::entity::EntityId;
use serde::Serialize;

/// Observable outcomes of a tick, one variant per law-level occurrence.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SimEventKind {
    // Chemistry
    /// Two reactants met and reacted.
    Reaction {
        /// The two reacting entities.
        reactants: [EntityId; 2],
        /// The spawned product. `None` when reactions are only detected.
        product: Option<EntityId>,
    },
    /// A proximity cluster merged into a material aggregate.
    Aggregated {
        /// The new aggregate entity.
        aggregate: EntityId,
        /// Constituents, now consumed into the aggregate.
        members: Vec<EntityId>,
    },

    // Lifecycle
    /// An organism reproduced.
    Born {
        /// The offspring.
        child: EntityId,
        /// The parent that paid the reproduction cost.
        parent: EntityId,
    },
    /// An entity was removed from the world.
    Died {
        /// The entity that died.
        entity: EntityId,
        /// The cause of death.
        cause: String,
    },

    // Bookkeeping
    /// The ledger rejected a transformation.
    ConservationViolated {
        /// Entities referenced by the violation.
        entities: Vec<EntityId>,
        /// Human-readable reason passed to the ledger.
        reason: String,
    },
    /// A system returned an error and was skipped for the rest of the tick.
    SystemFailed {
        /// Name of the failing system.
        system: String,
        /// The error message.
        message: String,
    },
}

impl SimEventKind {
    /// True if `id` appears anywhere in the payload.
    pub fn involves(&self, id: EntityId) -> bool {
        match self {
            Self::Reaction { reactants, product } => {
                reactants.contains(&id) || *product == Some(id)
            }
            Self::Aggregated { aggregate, members } => *aggregate == id || members.contains(&id),
            Self::Born { child, parent } => *child == id || *parent == id,
            Self::Died { entity, .. } => *entity == id,
            Self::ConservationViolated { entities, .. } => entities.contains(&id),
            Self::SystemFailed { .. } => false,
        }
    }
}

/// An event stamped with the tick it was emitted in.
#[derive(Debug, Clone, Serialize)]
pub struct SimEvent {
    /// Tick the event was emitted in.
    pub tick: u64,
    /// What happened.
    pub kind: SimEventKind,
    /// One-line summary for logs and the CLI.
    pub description: String,
}

impl SimEvent {
    /// Stamp `kind` with `tick`.
    pub fn new(tick: u64, kind: SimEventKind, description: impl Into<String>) -> Self {
        Self {
            tick,
            kind,
            description: description.into(),
        }
    }
}

/// Append-only event history, optionally capped to the newest `max_events`.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<SimEvent>,
    max_events: usize,
}

impl EventLog {
    /// `max_events == 0` keeps everything.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Vec::new(),
            max_events,
        }
    }

    /// Append an event, dropping the oldest one when the log is full.
    pub fn push(&mut self, event: SimEvent) {
        if self.max_events > 0 && self.events.len() == self.max_events {
            self.events.remove(0);
        }
        self.events.push(event);
    }

    /// All retained events, oldest first.
    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    /// Events emitted during `tick`.
    pub fn events_at_tick(&self, tick: u64) -> Vec<&SimEvent> {
        self.events.iter().filter(|e| e.tick == tick).collect()
    }

    /// Events whose payload references `id`.
    pub fn events_for_entity(&self, id: EntityId) -> Vec<&SimEvent> {
        self.events.iter().filter(|e| e.kind.involves(id)).collect()
    }

    /// Count events matching a predicate on their kind.
    pub fn count_where(&self, pred: impl Fn(&SimEventKind) -> bool) -> usize {
        self.events.iter().filter(|e| pred(&e.kind)).count()
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// `true` when nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop every retained event.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn died(tick: u64, entity: EntityId) -> SimEvent {
        SimEvent::new(
            tick,
            SimEventKind::Died {
                entity,
                cause: "starvation".into(),
            },
            "test",
        )
    }

    #[test]
    fn push_then_filter_by_tick_and_entity() {
        let mut log = EventLog::new(0);
        let id = EntityId::new();
        log.push(died(1, id));
        assert_eq!(log.len(), 1);
        assert_eq!(log.events_at_tick(1).len(), 1);
        assert_eq!(log.events_for_entity(id).len(), 1);
    }

    #[test]
    fn capped_log_keeps_newest() {
        let mut log = EventLog::new(2);
        let id = EntityId::new();
        for i in 0..5 {
            log.push(died(i, id));
        }
        assert_eq!(log.len(), 2);
        assert_eq!(log.events()[0].tick, 3);
        assert_eq!(log.events()[1].tick, 4);
    }

    #[test]
    fn involves_checks_every_payload_field() {
        let e1 = EntityId::new();
        let e2 = EntityId::new();
        let e3 = EntityId::new();

        let kind = SimEventKind::Reaction {
            reactants: [e1, e2],
            product: None,
        };
        assert!(kind.involves(e1));
        assert!(kind.involves(e2));
        assert!(!kind.involves(e3));

        let kind = SimEventKind::Aggregated {
            aggregate: e3,
            members: vec![e1],
        };
        assert!(kind.involves(e3));
        assert!(kind.involves(e1));
        assert!(!kind.involves(e2));

        let kind = SimEventKind::Born {
            child: e1,
            parent: e2,
        };
        assert!(kind.involves(e1));
        assert!(kind.involves(e2));

        let kind = SimEventKind::ConservationViolated {
            entities: vec![e2, e3],
            reason: "aggregation".into(),
        };
        assert!(kind.involves(e3));
        assert!(!kind.involves(e1));

        let kind = SimEventKind::Died {
            entity: e1,
            cause: "culled".into(),
        };
        assert!(kind.involves(e1));
        assert!(!kind.involves(e2));

        let kind = SimEventKind::SystemFailed {
            system: "motion".into(),
            message: "boom".into(),
        };
        assert!(!kind.involves(e1));
    }

    #[test]
    fn event_log_count_where_and_clear() {
        let mut log = EventLog::new(0);
        let id = EntityId::new();
        log.push(died(1, id));
        log.push(SimEvent::new(
            1,
            SimEventKind::SystemFailed {
                system: "x".into(),
                message: "y".into(),
            },
            "x failed",
        ));
        assert_eq!(
            log.count_where(|k| matches!(k, SimEventKind::SystemFailed { .. })),
            1
        );
        log.clear();
        assert!(log.is_empty());
    }
}
