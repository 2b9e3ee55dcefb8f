use model::{NetworkObject, ObjectTypeId, Point, ScalarValue, Team};
use replica::{GhostState, Registry, ReplicationConfig, ScopeAll, ShadowStore};

fn ship() -> NetworkObject {
    NetworkObject::new(ObjectTypeId::Ship, Team::new(0), vec![Point::new(3.0, 4.0)]).unwrap()
}

#[test]
fn one_destroy_notice_per_observer_with_pending_updates() {
    let config = ReplicationConfig::default();
    let mut registry = Registry::new(config.clone()).unwrap();
    let observers = [registry.add_connection(), registry.add_connection()];
    let mut stores = [
        ShadowStore::new(&config).unwrap(),
        ShadowStore::new(&config).unwrap(),
    ];
    let id = registry.register(ship()).unwrap();

    for (conn, store) in observers.iter().zip(stores.iter_mut()) {
        let packet = registry.pack_update(*conn, &ScopeAll).unwrap().unwrap();
        store.unpack_update(&packet.bytes).unwrap();
        registry.on_packet_delivered(*conn, packet.sequence).unwrap();
    }

    // Leave updates pending on both connections, one of them in flight.
    registry.set_scalar(id, 0, ScalarValue::Float(0.25)).unwrap();
    let in_flight = registry
        .pack_update(observers[0], &ScopeAll)
        .unwrap()
        .unwrap();
    registry.set_team(id, Team::new(1)).unwrap();
    for conn in observers {
        assert_eq!(registry.ghost_state(conn, id).unwrap(), GhostState::Dirty);
    }

    registry.unregister(id).unwrap();
    assert!(registry.unregister(id).is_err());

    for (conn, store) in observers.iter().zip(stores.iter_mut()) {
        assert_eq!(registry.pending_destroys(*conn).unwrap(), vec![id]);
        assert_eq!(registry.ghost_state(*conn, id).unwrap(), GhostState::Unscoped);
        let packet = registry.pack_update(*conn, &ScopeAll).unwrap().unwrap();
        assert_eq!(packet.sent.destroys, vec![id]);
        assert!(packet.sent.updates.is_empty());
        assert!(packet.sent.creates.is_empty());
        store.unpack_update(&packet.bytes).unwrap();
        assert!(store.is_tombstoned(id));
        assert!(registry.pack_update(*conn, &ScopeAll).unwrap().is_none());
    }

    // The stale in-flight update lands after the destroy and changes nothing.
    let report = stores[0].unpack_update(&in_flight.bytes).unwrap();
    assert_eq!(report.fields_applied, 0);
    assert!(stores[0].get(id).is_none());
    registry.on_packet_dropped(observers[0], in_flight.sequence).unwrap();
    assert!(registry.pending_destroys(observers[0]).unwrap().is_empty());
}

#[test]
fn never_sent_object_needs_no_notice() {
    let mut registry = Registry::new(ReplicationConfig::default()).unwrap();
    let conn = registry.add_connection();
    let id = registry.register(ship()).unwrap();
    registry.unregister(id).unwrap();
    assert!(registry.pending_destroys(conn).unwrap().is_empty());
    assert!(registry.pack_update(conn, &ScopeAll).unwrap().is_none());
}

#[test]
fn in_flight_create_still_gets_a_notice() {
    let config = ReplicationConfig::default();
    let mut registry = Registry::new(config.clone()).unwrap();
    let conn = registry.add_connection();
    let mut store = ShadowStore::new(&config).unwrap();
    let id = registry.register(ship()).unwrap();
    let create = registry.pack_update(conn, &ScopeAll).unwrap().unwrap();
    registry.unregister(id).unwrap();
    let destroy = registry.pack_update(conn, &ScopeAll).unwrap().unwrap();
    assert_eq!(destroy.sent.destroys, vec![id]);

    // Create arrives, then the destroy: the shadow is gone either way.
    store.unpack_update(&create.bytes).unwrap();
    store.unpack_update(&destroy.bytes).unwrap();
    assert!(store.get(id).is_none());
}
