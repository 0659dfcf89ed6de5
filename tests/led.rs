mod tests {
    use embassy_time::Instant;
    use light_touch_executor::config::{COLOR_FAIL, COLOR_OFF, COLOR_SHOW, COLOR_SUCCESS, LedTimings};
    use light_touch_executor::led::{LedEngine, LedError, PositionState, Strip, address_of};
    use light_touch_executor::{OutputDriver, Position, Rgb, SmartLedsOutput};
    use smart_leds::SmartLedsWrite;

    #[derive(Default)]
    struct FakeStrip {
        writes: usize,
        last: Vec<Rgb>,
    }

    impl OutputDriver for FakeStrip {
        fn write(&mut self, colors: &[Rgb]) {
            self.writes += 1;
            self.last = colors.to_vec();
        }
    }

    fn pos(letter: char) -> Position {
        Position::from_letter(letter).unwrap()
    }

    fn engine() -> LedEngine<FakeStrip> {
        LedEngine::new(
            FakeStrip::default(),
            FakeStrip::default(),
            LedTimings::default(),
        )
    }

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    fn all_off(engine: &LedEngine<FakeStrip>) -> bool {
        [Strip::First, Strip::Second]
            .into_iter()
            .all(|strip| engine.frame(strip).iter().all(|&pixel| pixel == COLOR_OFF))
    }

    fn pixel(engine: &LedEngine<FakeStrip>, position: Position, offset: isize) -> Rgb {
        let address = address_of(position);
        engine.frame(address.strip)[address.index.checked_add_signed(offset).unwrap()]
    }

    /// Tick every millisecond in `from..=to`
    fn run(engine: &mut LedEngine<FakeStrip>, from: u64, to: u64) {
        for ms in from..=to {
            engine.tick(at(ms));
        }
    }

    #[test]
    fn test_mapping_table() {
        let a = address_of(Position::A);
        assert_eq!((a.strip, a.index), (Strip::First, 153));
        let d = address_of(pos('D'));
        assert_eq!((d.strip, d.index), (Strip::Second, 177));
        let y = address_of(Position::Y);
        assert_eq!((y.strip, y.index), (Strip::Second, 34));
    }

    #[test]
    fn test_show_lights_single_pixel() {
        let mut engine = engine();
        engine.show(pos('B'));
        assert_eq!(engine.state(pos('B')), PositionState::Shown);
        assert_eq!(engine.center_color(pos('B')), COLOR_SHOW);
        assert_eq!(pixel(&engine, pos('B'), 1), COLOR_OFF);
        assert_eq!(pixel(&engine, pos('B'), -1), COLOR_OFF);
    }

    #[test]
    fn test_show_then_hide_restores_background_for_every_position() {
        for position in Position::all() {
            let mut engine = engine();
            engine.show(position);
            engine.hide(position);
            assert!(all_off(&engine), "position {}", position);
            assert_eq!(engine.state(position), PositionState::Off);
        }
    }

    #[test]
    fn test_hide_clears_expanded_pixels() {
        for position in Position::all() {
            let mut engine = engine();
            engine.success(position, at(0));
            run(&mut engine, 1, 200);
            assert_eq!(engine.state(position), PositionState::Expanded);
            engine.show(position);
            engine.hide(position);
            assert!(all_off(&engine), "position {}", position);
        }
    }

    #[test]
    fn test_hide_clears_manual_expansion() {
        let mut engine = engine();
        engine.show(pos('K'));
        for _ in 0..3 {
            engine.expand_step(pos('K')).unwrap();
        }
        engine.hide(pos('K'));
        assert!(all_off(&engine));
        assert_eq!(engine.expansion(pos('K')), 0);
    }

    #[test]
    fn test_success_reaches_expanded_after_max_radius_steps() {
        let timings = LedTimings::default();
        let full = timings.step.as_millis() * u64::from(timings.max_radius);
        let mut engine = engine();
        engine.success(pos('H'), at(0));
        assert_eq!(engine.center_color(pos('H')), COLOR_SUCCESS);

        run(&mut engine, 1, full - 1);
        assert_eq!(engine.state(pos('H')), PositionState::Animating);
        assert!(!engine.is_animation_complete(pos('H')));

        engine.tick(at(full));
        assert_eq!(engine.state(pos('H')), PositionState::Expanded);
        assert!(engine.is_animation_complete(pos('H')));
        for offset in -5..=5 {
            assert_eq!(pixel(&engine, pos('H'), offset), COLOR_SUCCESS);
        }
        assert_eq!(pixel(&engine, pos('H'), 6), COLOR_OFF);
    }

    #[test]
    fn test_success_radius_grows_one_step_per_interval() {
        let mut engine = engine();
        engine.success(pos('N'), at(0));
        engine.tick(at(24));
        assert_eq!(engine.animation_step(pos('N')), 0);
        engine.tick(at(25));
        assert_eq!(engine.animation_step(pos('N')), 1);
        engine.tick(at(49));
        assert_eq!(engine.animation_step(pos('N')), 1);
        engine.tick(at(50));
        assert_eq!(engine.animation_step(pos('N')), 2);
    }

    #[test]
    fn test_contract_shrinks_back_to_center() {
        let mut engine = engine();
        engine.success(pos('O'), at(0));
        run(&mut engine, 1, 125);
        engine.contract(pos('O'), at(125));
        assert_eq!(engine.state(pos('O')), PositionState::Contracting);
        assert!(!engine.is_contract_complete(pos('O')));

        run(&mut engine, 126, 249);
        assert_eq!(engine.state(pos('O')), PositionState::Contracting);
        engine.tick(at(250));
        assert_eq!(engine.state(pos('O')), PositionState::Shown);
        assert!(engine.is_contract_complete(pos('O')));
        assert_eq!(engine.center_color(pos('O')), COLOR_SUCCESS);
        for offset in [-5, -1, 1, 5] {
            assert_eq!(pixel(&engine, pos('O'), offset), COLOR_OFF);
        }
    }

    #[test]
    fn test_contract_when_not_expanded_shows_success_color() {
        let mut engine = engine();
        engine.contract(pos('P'), at(0));
        assert_eq!(engine.state(pos('P')), PositionState::Shown);
        assert_eq!(engine.center_color(pos('P')), COLOR_SUCCESS);
        assert!(engine.is_contract_complete(pos('P')));
    }

    #[test]
    fn test_fail_shows_error_color() {
        let mut engine = engine();
        engine.success(pos('C'), at(0));
        run(&mut engine, 1, 130);
        engine.fail(pos('C'));
        assert_eq!(engine.state(pos('C')), PositionState::Shown);
        assert_eq!(engine.center_color(pos('C')), COLOR_FAIL);
        assert_eq!(pixel(&engine, pos('C'), -2), COLOR_OFF);
    }

    #[test]
    fn test_blink_toggles_and_stops() {
        let mut engine = engine();
        engine.blink(pos('E'), at(0));
        assert_eq!(engine.state(pos('E')), PositionState::Blinking { lit: true });
        engine.tick(at(149));
        assert_ne!(engine.center_color(pos('E')), COLOR_OFF);
        engine.tick(at(150));
        assert_eq!(engine.center_color(pos('E')), COLOR_OFF);
        engine.tick(at(300));
        assert_ne!(engine.center_color(pos('E')), COLOR_OFF);

        engine.stop_blink(pos('E'));
        assert_eq!(engine.state(pos('E')), PositionState::Off);
        assert!(all_off(&engine));
    }

    #[test]
    fn test_stop_blink_ignores_other_states() {
        let mut engine = engine();
        engine.show(pos('F'));
        engine.stop_blink(pos('F'));
        assert_eq!(engine.state(pos('F')), PositionState::Shown);
        assert_eq!(engine.center_color(pos('F')), COLOR_SHOW);
    }

    #[test]
    fn test_manual_steps_are_clamped() {
        let mut engine = engine();
        engine.show(pos('J'));
        for _ in 0..8 {
            engine.expand_step(pos('J')).unwrap();
        }
        assert_eq!(engine.expansion(pos('J')), 5);
        assert_eq!(pixel(&engine, pos('J'), 5), COLOR_SHOW);
        assert_eq!(pixel(&engine, pos('J'), -5), COLOR_SHOW);
        assert_eq!(pixel(&engine, pos('J'), 6), COLOR_OFF);

        engine.contract_step(pos('J')).unwrap();
        assert_eq!(engine.expansion(pos('J')), 4);
        assert_eq!(pixel(&engine, pos('J'), 5), COLOR_OFF);
        for _ in 0..8 {
            engine.contract_step(pos('J')).unwrap();
        }
        assert_eq!(engine.expansion(pos('J')), 0);
        assert_eq!(engine.center_color(pos('J')), COLOR_SHOW);
        assert_eq!(engine.state(pos('J')), PositionState::Shown);
    }

    #[test]
    fn test_manual_steps_require_shown() {
        let mut engine = engine();
        assert_eq!(engine.expand_step(pos('A')), Err(LedError::AnimationConflict));
        engine.success(pos('A'), at(0));
        assert_eq!(engine.contract_step(pos('A')), Err(LedError::AnimationConflict));
    }

    #[test]
    fn test_pulse_runs_for_fixed_step_count() {
        let timings = LedTimings::default();
        let total = u64::from(timings.pulse_count)
            * u64::from(timings.pulse_steps)
            * 2
            * timings.pulse_step.as_millis();
        let mut engine = engine();
        engine.show(pos('A'));
        engine.start_pulse(at(0));
        assert!(!engine.is_pulse_complete());

        engine.tick(at(10));
        assert_eq!(engine.frame(Strip::First)[0].g, 2);
        assert_eq!(engine.frame(Strip::Second)[189].g, 2);

        let mut ms = 20;
        while ms < total {
            engine.tick(at(ms));
            ms += 10;
        }
        assert!(!engine.is_pulse_complete());
        engine.tick(at(total));
        assert!(engine.is_pulse_complete());
        assert!(all_off(&engine));
        assert_eq!(engine.state(pos('A')), PositionState::Off);
    }

    #[test]
    fn test_sweep_lights_range_then_completes() {
        let mut engine = engine();
        let color = Rgb { r: 10, g: 20, b: 30 };
        engine.start_sweep(color, 3, at(0));
        run(&mut engine, 1, 4);
        assert!(!engine.is_sweep_complete());
        for strip in [Strip::First, Strip::Second] {
            assert_eq!(&engine.frame(strip)[..4], &[color; 4]);
            assert_eq!(engine.frame(strip)[4], COLOR_OFF);
        }
        engine.tick(at(5));
        assert!(engine.is_sweep_complete());
    }

    #[test]
    fn test_hide_all_cancels_global_animations() {
        let mut engine = engine();
        engine.show(pos('S'));
        engine.start_pulse(at(0));
        engine.start_sweep(COLOR_SHOW, 50, at(0));
        engine.hide_all();
        assert!(engine.is_pulse_complete());
        assert!(engine.is_sweep_complete());
        assert!(all_off(&engine));
        assert_eq!(engine.state(pos('S')), PositionState::Off);
    }

    #[test]
    fn test_flush_once_per_tick_only_when_changed() {
        let mut engine = engine();
        engine.tick(at(0));
        assert_eq!(engine.strips()[0].writes, 1);
        assert_eq!(engine.strips()[1].writes, 1);

        engine.tick(at(1));
        assert_eq!(engine.strips()[0].writes, 1);

        engine.show(pos('A'));
        engine.show(pos('D'));
        engine.tick(at(2));
        assert_eq!(engine.strips()[0].writes, 2);
        assert_eq!(engine.strips()[1].writes, 2);
        let a = address_of(pos('A'));
        assert_eq!(engine.strips()[0].last[a.index], COLOR_SHOW);
    }

    #[derive(Default)]
    struct RecordingWriter(Vec<Rgb>);

    impl SmartLedsWrite for RecordingWriter {
        type Error = ();
        type Color = Rgb;

        fn write<T, I>(&mut self, iterator: T) -> Result<(), Self::Error>
        where
            T: IntoIterator<Item = I>,
            I: Into<Self::Color>,
        {
            self.0 = iterator.into_iter().map(Into::into).collect();
            Ok(())
        }
    }

    #[test]
    fn test_smart_leds_output_scales_brightness() {
        let colors = [
            Rgb { r: 255, g: 100, b: 0 },
            Rgb { r: 0, g: 0, b: 2 },
        ];
        let mut output = SmartLedsOutput::new(RecordingWriter::default()).with_brightness(128);
        output.write(&colors);
        output.set_brightness(255);
        let scaled = output.into_inner().0;
        assert_eq!(
            scaled,
            [Rgb { r: 128, g: 50, b: 0 }, Rgb { r: 0, g: 0, b: 1 }]
        );

        let mut full = SmartLedsOutput::new(RecordingWriter::default()).with_brightness(255);
        full.write(&colors);
        assert_eq!(full.into_inner().0, colors);
    }
}
