//! Buffer/intersect batch pipeline.
//!
//! Mirrors the n8n geoprocessing node the service replaces: each batch item
//! carries a "coop" and a "protected" feature collection, either as named
//! objects or as numbered `kind_1`/`name_1`/`geojson_1` fields produced by a
//! merge step. Per item, the coop union is buffered by the configured
//! distance in Web Mercator metres and intersected with the protected
//! union; the result is reported as GeoJSON plus an overlap area in km².
//!
//! The batch is robust: a failing item yields an error record and the rest
//! of the batch still flows.

use std::sync::Arc;

use geo::{Area, Geometry, MultiPolygon};
use geojson::{Feature, FeatureCollection};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::error::{Error, InputError};
use crate::geometry::{self, validate, GeometryKernel};
use crate::projection::{CrsCode, ProjectionKernel};

/// A batch of items to process.
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    /// Items, one per upstream input.
    pub items: Vec<BatchItem>,
}

/// One batch item, wrapping an arbitrary JSON object.
#[derive(Debug, Deserialize)]
pub struct BatchItem {
    /// The item payload; only the pair-picking keys are interpreted.
    pub json: Map<String, Value>,
}

/// The (coop, protected) pair extracted from an item.
struct Pair<'a> {
    coop_name: Option<&'a str>,
    coop_fc: Option<&'a Value>,
    protected_name: Option<&'a str>,
    protected_fc: Option<&'a Value>,
}

/// The buffer/intersect pipeline, bound to its kernels and buffer distance.
pub struct BufferIntersect {
    geometry: Arc<dyn GeometryKernel>,
    projection: Arc<dyn ProjectionKernel>,
    buffer_km: f64,
}

impl BufferIntersect {
    /// Creates a pipeline over the given kernels.
    pub fn new(
        geometry: Arc<dyn GeometryKernel>,
        projection: Arc<dyn ProjectionKernel>,
        buffer_km: f64,
    ) -> Self {
        Self {
            geometry,
            projection,
            buffer_km,
        }
    }

    /// Processes a whole batch, one output record per item.
    ///
    /// Item failures are captured as `{"json": {"error": ...}}` records so
    /// downstream automation keeps flowing.
    pub fn run(&self, request: &BatchRequest) -> Vec<Value> {
        request
            .items
            .iter()
            .map(|item| match self.process_one(&item.json) {
                Ok(output) => json!({ "json": output }),
                Err(e) => {
                    warn!("batch item failed: {e}");
                    json!({ "json": { "error": e.to_string() } })
                }
            })
            .collect()
    }

    fn process_one(&self, item: &Map<String, Value>) -> Result<Map<String, Value>, Error> {
        let pair = pick_pair(item)?;
        let coop_name = clean_name(pair.coop_name, "coop");
        let protected_name = clean_name(pair.protected_name, "protected");

        let coop_union = self.union_from_fc(pair.coop_fc)?;
        let protected_union = self.union_from_fc(pair.protected_fc)?;

        let coop_buffer = if coop_union.0.is_empty() {
            MultiPolygon(Vec::new())
        } else {
            self.buffered(coop_union)?
        };

        let mut overlap_features = Vec::new();
        let mut overlap_area_km2 = 0.0;
        if !coop_buffer.0.is_empty() && !protected_union.0.is_empty() {
            let overlap = self.geometry.intersection(
                &Geometry::MultiPolygon(coop_buffer.clone()),
                &Geometry::MultiPolygon(protected_union),
            )?;

            let mut area_m2 = 0.0;
            for piece in as_multi_polygon(overlap).0 {
                if piece.exterior().0.is_empty() {
                    continue;
                }
                // Area is measured in the metric plane, piece by piece.
                let projected = self.projection.transform(
                    &Geometry::Polygon(piece.clone()),
                    &CrsCode::epsg(4326),
                    &CrsCode::epsg(3857),
                )?;
                area_m2 += projected.unsigned_area();

                overlap_features.push(feature(
                    geometry::to_geojson(&Geometry::Polygon(piece)),
                    &[
                        ("coop", json!(coop_name)),
                        ("protected", json!(protected_name)),
                        ("buffer_km", json!(self.buffer_km)),
                    ],
                ));
            }
            overlap_area_km2 = round6(area_m2 / 1_000_000.0);
        }
        let overlap_count = overlap_features.len();

        let buffer_features = if coop_buffer.0.is_empty() {
            Vec::new()
        } else {
            vec![feature(
                geometry::to_geojson(&Geometry::MultiPolygon(coop_buffer)),
                &[
                    ("coop", json!(coop_name)),
                    ("buffer_km", json!(self.buffer_km)),
                ],
            )]
        };

        let km = self.buffer_km;
        let mut output = Map::new();
        output.insert(
            "overlapFile".to_string(),
            json!(format!(
                "{coop_name}__x__{protected_name}__overlap_{km}km.geojson"
            )),
        );
        output.insert(
            "bufferFile".to_string(),
            json!(format!("{coop_name}__buffer_{km}km.geojson")),
        );
        output.insert(
            "overlap_geojson".to_string(),
            json!(collection(overlap_features)),
        );
        output.insert(
            "buffer_geojson".to_string(),
            json!(collection(buffer_features)),
        );
        output.insert("coop".to_string(), json!(coop_name));
        output.insert("protected".to_string(), json!(protected_name));
        output.insert("buffer_km".to_string(), json!(self.buffer_km));
        output.insert("overlap_feature_count".to_string(), json!(overlap_count));
        output.insert("overlap_area_km2".to_string(), json!(overlap_area_km2));
        Ok(output)
    }

    /// Unions the polygonal features of a feature collection value.
    ///
    /// Features whose geometry is missing, malformed or non-areal are
    /// skipped rather than failing the item; a collection value of the
    /// wrong shape fails it.
    fn union_from_fc(&self, fc: Option<&Value>) -> Result<MultiPolygon<f64>, Error> {
        let Some(fc) = fc else {
            return Ok(MultiPolygon(Vec::new()));
        };
        let features = match fc {
            Value::Null => return Ok(MultiPolygon(Vec::new())),
            Value::Object(object) => match object.get("features") {
                None => return Ok(MultiPolygon(Vec::new())),
                Some(Value::Array(features)) => features,
                Some(_) => {
                    return Err(InputError::MalformedRequest(
                        "'features' must be an array".to_string(),
                    )
                    .into())
                }
            },
            _ => {
                return Err(InputError::MalformedRequest(
                    "feature collection must be an object".to_string(),
                )
                .into())
            }
        };

        let mut parts = Vec::new();
        for raw in features {
            let Some(geometry_value) = raw.get("geometry") else {
                continue;
            };
            let Ok(gj) = serde_json::from_value::<geojson::Geometry>(geometry_value.clone())
            else {
                continue;
            };
            if validate::check_geometry(&gj).is_err() {
                continue;
            }
            if let Ok(geom) = geometry::to_geo(&gj) {
                parts.push(geom);
            }
        }

        Ok(as_multi_polygon(self.geometry.unary_union(&parts)?))
    }

    /// Buffers a union by the configured distance: project to metres,
    /// dilate, project back.
    fn buffered(&self, union: MultiPolygon<f64>) -> Result<MultiPolygon<f64>, Error> {
        let wgs84 = CrsCode::epsg(4326);
        let mercator = CrsCode::epsg(3857);

        let metric =
            self.projection
                .transform(&Geometry::MultiPolygon(union), &wgs84, &mercator)?;
        let buffered = self.geometry.buffer(&metric, self.buffer_km * 1000.0)?;
        let geographic = self.projection.transform(&buffered, &mercator, &wgs84)?;
        Ok(as_multi_polygon(geographic))
    }
}

fn pick_pair(item: &Map<String, Value>) -> Result<Pair<'_>, InputError> {
    if item.contains_key("coop") && item.contains_key("protected") {
        let coop = entry_object(item, "coop")?;
        let protected = entry_object(item, "protected")?;
        return Ok(Pair {
            coop_name: str_field(coop, "name"),
            coop_fc: coop.get("geojson"),
            protected_name: str_field(protected, "name"),
            protected_fc: protected.get("geojson"),
        });
    }

    // Merge(Combine) fallback: deduce the pair from _1/_2 suffixed fields,
    // preferring the entry whose kind starts with "coop".
    let kind_1 = item.get("kind_1").and_then(Value::as_str);
    let kind_2 = item.get("kind_2").and_then(Value::as_str);

    let first = (
        item.get("name_1").and_then(Value::as_str),
        item.get("geojson_1"),
    );
    let second = (
        item.get("name_2").and_then(Value::as_str),
        item.get("geojson_2"),
    );

    let first_is_coop = match (kind_1, kind_2) {
        // No kinds at all: assume first is coop, second is protected.
        (None, None) => true,
        _ => kind_1
            .map(|k| k.to_lowercase().starts_with("coop"))
            .unwrap_or(false),
    };

    let (coop, protected) = if first_is_coop {
        (first, second)
    } else {
        (second, first)
    };

    Ok(Pair {
        coop_name: coop.0,
        coop_fc: coop.1,
        protected_name: protected.0,
        protected_fc: protected.1,
    })
}

fn entry_object<'a>(
    item: &'a Map<String, Value>,
    key: &str,
) -> Result<&'a Map<String, Value>, InputError> {
    item.get(key)
        .and_then(Value::as_object)
        .ok_or_else(|| InputError::MalformedRequest(format!("'{key}' must be an object")))
}

fn str_field<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    object.get(key).and_then(Value::as_str)
}

fn clean_name(name: Option<&str>, default: &str) -> String {
    name.unwrap_or(default).replace(".geojson", "")
}

fn feature(geometry: geojson::Geometry, properties: &[(&str, Value)]) -> Feature {
    let mut map = Map::new();
    for (key, value) in properties {
        map.insert((*key).to_string(), value.clone());
    }
    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(map),
        foreign_members: None,
    }
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn as_multi_polygon(geometry: Geometry<f64>) -> MultiPolygon<f64> {
    match geometry {
        Geometry::MultiPolygon(multi) => multi,
        Geometry::Polygon(polygon) => MultiPolygon(vec![polygon]),
        _ => MultiPolygon(Vec::new()),
    }
}

fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}
