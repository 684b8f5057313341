//! Saved-location round trip: a flat `location_<name>=x y z` config
//! entry must surface with a title-cased label and re-render through the
//! teleport builder as exactly the same three numeric tokens.

use std::collections::HashMap;

use dadmin::command::{CommandBuilder, ResolvedDestination};
use dadmin::config::{Axis, Config, Location};

#[test]
fn flat_entry_to_teleport_tokens() {
    let mut map = HashMap::new();
    map.insert(
        "location_village_square".to_string(),
        "150 70 -45".to_string(),
    );
    let config = Config::from_map(&map).unwrap();
    let locations = config.parse_locations().unwrap();
    assert_eq!(locations.len(), 1);

    let village = &locations[0];
    assert_eq!(village.label, "Village Square");
    assert_eq!(village.x, Axis::Value(150.0));
    assert_eq!(village.y, Axis::Value(70.0));
    assert_eq!(village.z, Axis::Value(-45.0));

    let cmd = CommandBuilder::new()
        .teleport("Steve", &ResolvedDestination::Location(village))
        .unwrap();
    assert_eq!(cmd, "tp Steve 150 70 -45");
}

#[test]
fn comma_separated_entry_renders_identically() {
    let spaced = Location::parse("spawn", "0 64 0").unwrap();
    let commaed = Location::parse("spawn", "0, 64, 0").unwrap();
    assert_eq!(spaced, commaed);

    let builder = CommandBuilder::new();
    assert_eq!(
        builder
            .teleport("Alex", &ResolvedDestination::Location(&spaced))
            .unwrap(),
        builder
            .teleport("Alex", &ResolvedDestination::Location(&commaed))
            .unwrap(),
    );
}

#[test]
fn passthrough_axis_survives_the_round_trip() {
    let mut map = HashMap::new();
    map.insert("location_sky_hole".to_string(), "100 ~ -20".to_string());
    let config = Config::from_map(&map).unwrap();
    let locations = config.parse_locations().unwrap();

    let cmd = CommandBuilder::new()
        .teleport("Steve", &ResolvedDestination::Location(&locations[0]))
        .unwrap();
    assert_eq!(cmd, "tp Steve 100 ~ -20");
}
