use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub min_z: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub max_z: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Collisions {
    pub block_name_to_shape_ids: HashMap<String, Vec<i32>>,
    pub shape_id_to_shapes: HashMap<i32, Vec<BoundingBox>>,
}

/// Loads `collisions.json`: `{"blocks": {name: shapeId|[shapeIds]}, "shapes":
/// {shapeId_as_string: [[minX,minY,minZ,maxX,maxY,maxZ], ...]}}`. Each
/// section is independently optional — a missing one is logged and left
/// empty rather than aborting the whole load.
pub fn load_collisions(path: impl AsRef<Path>) -> Collisions {
    let path = path.as_ref();
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("failed to open collisions JSON file: {}: {}", path.display(), e);
            return Collisions::default();
        }
    };

    let raw: serde_json::Value = match serde_json::from_str(&contents) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("JSON parse error in {}: {}", path.display(), e);
            return Collisions::default();
        }
    };

    let mut collisions = Collisions::default();

    match raw.get("blocks").and_then(|v| v.as_object()) {
        Some(blocks) => {
            for (key, value) in blocks {
                if let Some(id) = value.as_i64() {
                    collisions.block_name_to_shape_ids.insert(key.clone(), vec![id as i32]);
                } else if let Some(arr) = value.as_array() {
                    let ids: Vec<i32> = arr.iter().filter_map(|v| v.as_i64().map(|i| i as i32)).collect();
                    collisions.block_name_to_shape_ids.insert(key.clone(), ids);
                }
            }
        }
        None => tracing::error!("no 'blocks' section found in {}", path.display()),
    }

    match raw.get("shapes").and_then(|v| v.as_object()) {
        Some(shapes) => {
            for (key, value) in shapes {
                let Ok(shape_id) = key.parse::<i32>() else {
                    continue;
                };
                let Some(arr) = value.as_array() else {
                    continue;
                };
                let mut boxes = Vec::new();
                for shape in arr {
                    let Some(coords) = shape.as_array() else { continue };
                    if coords.len() != 6 {
                        continue;
                    }
                    let get = |i: usize| coords[i].as_f64().unwrap_or(0.0);
                    boxes.push(BoundingBox {
                        min_x: get(0),
                        min_y: get(1),
                        min_z: get(2),
                        max_x: get(3),
                        max_y: get(4),
                        max_z: get(5),
                    });
                }
                collisions.shape_id_to_shapes.insert(shape_id, boxes);
            }
        }
        None => tracing::error!("no 'shapes' section found in {}", path.display()),
    }

    collisions
}
