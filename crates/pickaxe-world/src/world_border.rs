/// Shared world-border state. Every mutator both updates this struct and
/// returns the values the caller needs to build the corresponding
/// clientbound packet — callers are expected to broadcast in the same
/// call that mutates, never one without the other.
#[derive(Debug, Clone)]
pub struct WorldBorder {
    pub center_x: f64,
    pub center_z: f64,
    pub size: f64,
    pub warning_blocks: i32,
    pub warning_time: i32,
    pub portal_teleport_boundary: i32,
}

impl Default for WorldBorder {
    fn default() -> Self {
        Self {
            center_x: 0.0,
            center_z: 0.0,
            size: 60_000_000.0,
            warning_blocks: 5,
            warning_time: 15,
            portal_teleport_boundary: 29_999_984,
        }
    }
}

impl WorldBorder {
    pub fn update_center(&mut self, x: f64, z: f64) {
        self.center_x = x;
        self.center_z = z;
    }

    /// Returns the old diameter so the caller can build a Set Border Lerp
    /// Size packet (Old Diameter / New Diameter / Speed).
    pub fn update_size(&mut self, new_diameter: f64) -> f64 {
        let old = self.size;
        self.size = new_diameter;
        old
    }

    pub fn update_warning_blocks(&mut self, warning_blocks: i32) {
        self.warning_blocks = warning_blocks;
    }

    pub fn update_warning_time(&mut self, warning_time: i32) {
        self.warning_time = warning_time;
    }
}

/// Shared world-time state (age ticks up every tick; time of day wraps at
/// 24000 unless frozen by a game rule — frozen time is out of scope here).
#[derive(Debug, Clone, Default)]
pub struct WorldTime {
    pub world_age: i64,
    pub time_of_day: i64,
}

impl WorldTime {
    pub fn tick(&mut self) {
        self.world_age = self.world_age.wrapping_add(1);
        self.time_of_day = self.time_of_day.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_border_lerp_returns_old_diameter() {
        let mut border = WorldBorder::default();
        border.size = 100.0;
        let old = border.update_size(50.0);
        assert_eq!(old, 100.0);
        assert_eq!(border.size, 50.0);
    }

    #[test]
    fn test_time_ticks_forward() {
        let mut time = WorldTime::default();
        time.tick();
        time.tick();
        assert_eq!(time.world_age, 2);
        assert_eq!(time.time_of_day, 2);
    }
}
