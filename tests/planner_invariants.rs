// Integration tests covering the planner's end-to-end guarantees: a full
// polyline set run through the public `build_plan` entry point, not just
// the individual block/segment unit tests inside `src/motion`.

#[cfg(test)]
mod tests {
    use ebb_plotter::device::{AccelerationProfile, Device, Hardware, ToolingProfile};
    use ebb_plotter::ebb::SubStepAccumulator;
    use ebb_plotter::motion::{build_plan, Motion};
    use ebb_plotter::vec2::Vec2;

    fn profile() -> AccelerationProfile {
        AccelerationProfile { acceleration: 1200.0, max_velocity: 250.0, cornering_factor: 0.7 }
    }

    fn tooling() -> ToolingProfile {
        let p = profile();
        ToolingProfile {
            pen_down_profile: p,
            pen_up_profile: p,
            pen_down_pos: 21000,
            pen_up_pos: 34500,
            pen_lift_duration: 0.15,
            pen_drop_duration: 0.12,
        }
    }

    fn device() -> Device {
        Device::new(5, 21000, 34500, Hardware::V3)
    }

    fn square_paths() -> Vec<Vec<Vec2>> {
        vec![
            vec![Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0), Vec2::new(100.0, 100.0)],
            vec![Vec2::new(50.0, 50.0), Vec2::new(150.0, 50.0)],
        ]
    }

    #[test]
    fn plan_round_trips_through_json() {
        let plan = build_plan(&square_paths(), &tooling(), Vec2::ZERO).unwrap();
        let json = serde_json::to_string(&plan).unwrap();
        let back: ebb_plotter::motion::Plan = serde_json::from_str(&json).unwrap();
        assert_eq!(plan, back);
    }

    #[test]
    fn every_xy_motion_starts_and_ends_at_rest() {
        let plan = build_plan(&square_paths(), &tooling(), Vec2::ZERO).unwrap();
        for xy in plan.xy_motions() {
            assert!(xy.starts_and_ends_at_rest(), "motion {:?}..{:?} does not rest at its ends", xy.p1(), xy.p2());
        }
    }

    #[test]
    fn block_boundaries_are_continuous_within_every_motion() {
        let plan = build_plan(&square_paths(), &tooling(), Vec2::ZERO).unwrap();
        for xy in plan.xy_motions() {
            for w in xy.blocks().windows(2) {
                assert!((w[0].v_final() - w[1].v_initial).abs() < 1e-3);
                assert_eq!(w[0].p2, w[1].p1);
            }
        }
    }

    #[test]
    fn velocity_and_acceleration_stay_within_profile_limits() {
        let p = profile();
        let plan = build_plan(&square_paths(), &tooling(), Vec2::ZERO).unwrap();
        for xy in plan.xy_motions() {
            for block in xy.blocks() {
                assert!(block.v_initial <= p.max_velocity + 1e-6);
                assert!(block.v_final() <= p.max_velocity + 1e-6);
                assert!(block.accel.abs() <= p.acceleration + 1e-6);
            }
        }
    }

    #[test]
    fn plan_starts_and_ends_at_the_home_position() {
        let home = Vec2::new(12.0, -7.0);
        let plan = build_plan(&square_paths(), &tooling(), home).unwrap();
        let xys: Vec<_> = plan.xy_motions().collect();
        assert_eq!(xys.first().unwrap().p1(), home);
        assert_eq!(xys.last().unwrap().p2(), home);
    }

    #[test]
    fn pen_motions_alternate_down_up_once_per_path() {
        let paths = square_paths();
        let plan = build_plan(&paths, &tooling(), Vec2::ZERO).unwrap();
        let pens: Vec<_> = plan.pen_motions().collect();
        assert_eq!(pens.len(), paths.len() * 2);
        for chunk in pens.chunks(2) {
            assert!(!chunk[0].is_raising(), "expected a pen-down before each draw");
            assert!(chunk[1].is_raising(), "expected a pen-up after each draw");
        }
    }

    #[test]
    fn collinear_extra_point_preserves_total_plan_duration() {
        let tooling = tooling();
        let without_extra = build_plan(&[vec![Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0)]], &tooling, Vec2::ZERO).unwrap();
        let with_extra =
            build_plan(&[vec![Vec2::new(0.0, 0.0), Vec2::new(60.0, 0.0), Vec2::new(100.0, 0.0)]], &tooling, Vec2::ZERO).unwrap();

        let total_duration = |plan: &ebb_plotter::motion::Plan| -> f64 {
            plan.motions()
                .iter()
                .filter_map(Motion::as_xy)
                .map(|xy| xy.duration())
                .sum()
        };
        assert!((total_duration(&without_extra) - total_duration(&with_extra)).abs() < 1e-6);
    }

    #[test]
    fn empty_input_plans_a_single_home_to_home_motion() {
        let plan = build_plan(&[], &tooling(), Vec2::ZERO).unwrap();
        assert_eq!(plan.len(), 1);
        let xy = plan.motions()[0].as_xy().unwrap();
        assert_eq!(xy.p1(), Vec2::ZERO);
        assert_eq!(xy.p2(), Vec2::ZERO);
        assert_eq!(xy.duration(), 0.0);
    }

    /// A full plan's blocks, once converted to device steps, never carry a
    /// sub-step error of a full step or more between consecutive blocks —
    /// the fractional remainder `fx - floor(fx)` is always in `[0, 1)`.
    #[test]
    fn substep_error_stays_below_one_step_across_a_whole_motion() {
        let device = device();
        let plan = build_plan(&square_paths(), &tooling(), Vec2::ZERO).unwrap();
        let mult = 16.0; // mode-1 sixteenth-microstepping multiplier
        let mut acc = SubStepAccumulator::new();
        for xy in plan.xy_motions() {
            for block in xy.blocks() {
                let dx = device.mm_to_steps(block.p2.x - block.p1.x);
                let dy = device.mm_to_steps(block.p2.y - block.p1.y);
                acc.accumulate(dx, dy, mult);
                let (ex, ey) = acc.error();
                assert!(ex.abs() < 1.0);
                assert!(ey.abs() < 1.0);
            }
        }
    }
}
