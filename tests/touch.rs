mod tests {
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};

    use embassy_time::{Duration, Instant};
    use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
    use light_touch_executor::config::{SENSOR_I2C_ADDRESSES, TouchTimings};
    use light_touch_executor::touch::{
        BusError, I2cRegisters, RegisterBus, Sensitivity, TouchControl, TouchEngine, TouchError,
        TouchHandle, Watch,
    };
    use light_touch_executor::{CommandId, Event, EventSink, Position, TimedMutex};

    const REG_STATUS: u8 = 0x03;
    const REG_DELTA: u8 = 0x10;
    const REG_SENSITIVITY: u8 = 0x1F;
    const REG_CALIBRATE: u8 = 0x26;
    const REG_PRODUCT_ID: u8 = 0xFD;

    #[derive(Default)]
    struct FakeBus {
        sensors: HashSet<u8>,
        registers: HashMap<(u8, u8), u8>,
        writes: Vec<(u8, u8, u8)>,
        failing: HashSet<u8>,
    }

    impl FakeBus {
        fn with_sensors(positions: &[Position]) -> Self {
            let mut bus = Self::default();
            for &position in positions {
                let address = address(position);
                bus.sensors.insert(address);
                bus.registers.insert((address, REG_PRODUCT_ID), 0x50);
            }
            bus
        }

        fn set_touched(&mut self, position: Position, touched: bool) {
            self.registers
                .insert((address(position), REG_STATUS), u8::from(touched));
        }

        fn writes_to(&self, register: u8) -> Vec<(u8, u8, u8)> {
            self.writes
                .iter()
                .copied()
                .filter(|&(_, reg, _)| reg == register)
                .collect()
        }
    }

    impl RegisterBus for FakeBus {
        fn read_register(&mut self, address: u8, register: u8) -> Result<u8, BusError> {
            if self.failing.contains(&address) {
                return Err(BusError::Transfer);
            }
            if !self.sensors.contains(&address) {
                return Err(BusError::NoAcknowledge);
            }
            Ok(self.registers.get(&(address, register)).copied().unwrap_or(0))
        }

        fn write_register(&mut self, address: u8, register: u8, value: u8) -> Result<(), BusError> {
            if self.failing.contains(&address) {
                return Err(BusError::Transfer);
            }
            if !self.sensors.contains(&address) {
                return Err(BusError::NoAcknowledge);
            }
            self.writes.push((address, register, value));
            self.registers.insert((address, register), value);
            Ok(())
        }
    }

    #[derive(Default)]
    struct Collected(RefCell<Vec<Event>>);

    impl EventSink for Collected {
        fn push(&self, event: Event) -> bool {
            self.0.borrow_mut().push(event);
            true
        }
    }

    impl Collected {
        fn take(&self) -> Vec<Event> {
            std::mem::take(&mut *self.0.borrow_mut())
        }
    }

    fn pos(letter: char) -> Position {
        Position::from_letter(letter).unwrap()
    }

    fn address(position: Position) -> u8 {
        SENSOR_I2C_ADDRESSES[position.index()]
    }

    fn engine(positions: &[Position]) -> TouchEngine<FakeBus> {
        let mut engine = TouchEngine::new(FakeBus::with_sensors(positions), TouchTimings::default());
        engine.probe_all();
        engine
    }

    /// Tick every poll interval from `from` to `to` inclusive
    fn run(engine: &mut TouchEngine<FakeBus>, sink: &Collected, from: u64, to: u64) {
        let mut t = from;
        while t <= to {
            engine.tick(Instant::from_millis(t), sink);
            t += 5;
        }
    }

    #[test]
    fn test_probe_marks_found_channels_active() {
        let mut engine = TouchEngine::new(
            FakeBus::with_sensors(&[pos('A'), pos('C')]),
            TouchTimings::default(),
        );
        assert_eq!(engine.probe_all(), 2);
        assert!(engine.is_active(pos('A')));
        assert!(!engine.is_active(pos('B')));
        assert_eq!(
            engine.active_channels().unwrap().as_slice(),
            &[pos('A'), pos('C')]
        );
    }

    #[test]
    fn test_probe_configures_sensor() {
        let engine = engine(&[pos('A')]);
        let bus = &engine_bus(engine);
        let a = address(pos('A'));
        assert!(bus.writes.contains(&(a, 0x2A, 0x00)));
        assert!(bus.writes.contains(&(a, 0x41, 0x30)));
        assert!(bus.writes.contains(&(a, 0x21, 0x01)));
    }

    fn engine_bus(mut engine: TouchEngine<FakeBus>) -> FakeBus {
        std::mem::take(engine.bus_mut())
    }

    #[test]
    fn test_probe_rejects_wrong_product_id() {
        let mut bus = FakeBus::with_sensors(&[pos('A')]);
        bus.registers.insert((address(pos('A')), REG_PRODUCT_ID), 0x51);
        let mut engine = TouchEngine::new(bus, TouchTimings::default());
        assert_eq!(engine.probe_all(), 0);
    }

    #[test]
    fn test_stable_press_reports_once() {
        let mut engine = engine(&[pos('A')]);
        let sink = Collected::default();
        engine.expect_press(pos('A'), Some(CommandId(7))).unwrap();

        engine.bus_mut().set_touched(pos('A'), true);
        run(&mut engine, &sink, 0, 95);
        assert!(sink.take().is_empty());

        run(&mut engine, &sink, 100, 500);
        assert_eq!(
            sink.take(),
            vec![Event::Touched {
                position: pos('A'),
                id: Some(CommandId(7)),
            }]
        );
        assert!(engine.channel(pos('A')).reported);
    }

    #[test]
    fn test_oscillation_faster_than_dwell_is_never_reported() {
        let mut engine = engine(&[pos('A')]);
        let sink = Collected::default();
        engine.expect_press(pos('A'), None).unwrap();
        engine.expect_release(pos('A'), None).unwrap();

        let mut touched = false;
        let mut t = 0;
        while t <= 2000 {
            if t % 40 == 0 {
                touched = !touched;
                engine.bus_mut().set_touched(pos('A'), touched);
            }
            engine.tick(Instant::from_millis(t), &sink);
            t += 5;
        }
        assert!(sink.take().is_empty());
        let channel = engine.channel(pos('A'));
        assert!(!channel.debounced);
        assert!(!channel.reported);
        assert!(engine.press_watch(pos('A')).is_armed());
    }

    #[test]
    fn test_press_without_watch_is_absorbed() {
        let mut engine = engine(&[pos('A')]);
        let sink = Collected::default();
        engine.bus_mut().set_touched(pos('A'), true);
        run(&mut engine, &sink, 0, 300);
        assert!(sink.take().is_empty());
        assert!(engine.channel(pos('A')).debounced);
    }

    #[test]
    fn test_watch_is_one_shot() {
        let mut engine = engine(&[pos('A')]);
        let sink = Collected::default();
        engine.expect_press(pos('A'), Some(CommandId(1))).unwrap();

        engine.bus_mut().set_touched(pos('A'), true);
        run(&mut engine, &sink, 0, 200);
        engine.bus_mut().set_touched(pos('A'), false);
        run(&mut engine, &sink, 205, 400);
        engine.bus_mut().set_touched(pos('A'), true);
        run(&mut engine, &sink, 405, 600);

        assert_eq!(sink.take().len(), 1);
        assert_eq!(engine.press_watch(pos('A')), Watch::Idle);
    }

    #[test]
    fn test_release_watch_matches_release_only() {
        let mut engine = engine(&[pos('A')]);
        let sink = Collected::default();
        engine.expect_release(pos('A'), Some(CommandId(3))).unwrap();

        engine.bus_mut().set_touched(pos('A'), true);
        run(&mut engine, &sink, 0, 200);
        assert!(sink.take().is_empty());

        engine.bus_mut().set_touched(pos('A'), false);
        run(&mut engine, &sink, 205, 400);
        assert_eq!(
            sink.take(),
            vec![Event::TouchReleased {
                position: pos('A'),
                id: Some(CommandId(3)),
            }]
        );
    }

    #[test]
    fn test_cleared_watch_does_not_fire() {
        let mut engine = engine(&[pos('A')]);
        let sink = Collected::default();
        engine.expect_press(pos('A'), Some(CommandId(2))).unwrap();
        engine.clear_press_watch(pos('A')).unwrap();

        engine.bus_mut().set_touched(pos('A'), true);
        run(&mut engine, &sink, 0, 300);
        assert!(sink.take().is_empty());
    }

    #[test]
    fn test_bus_error_keeps_current_reading() {
        let mut engine = engine(&[pos('A')]);
        let sink = Collected::default();
        engine.expect_release(pos('A'), None).unwrap();

        engine.bus_mut().set_touched(pos('A'), true);
        run(&mut engine, &sink, 0, 200);
        assert!(engine.channel(pos('A')).debounced);

        engine.bus_mut().failing.insert(address(pos('A')));
        run(&mut engine, &sink, 205, 600);
        let channel = engine.channel(pos('A'));
        assert!(channel.current);
        assert!(channel.debounced);
        assert!(channel.faulted);
        assert!(sink.take().is_empty());

        engine.bus_mut().failing.clear();
        run(&mut engine, &sink, 605, 610);
        assert!(!engine.channel(pos('A')).faulted);
    }

    #[test]
    fn test_tick_is_rate_limited() {
        let mut engine = engine(&[pos('A')]);
        let sink = Collected::default();
        engine.tick(Instant::from_millis(0), &sink);
        let reads = |engine: &mut TouchEngine<FakeBus>| engine.bus_mut().writes.len();
        engine.bus_mut().set_touched(pos('A'), true);
        let before = reads(&mut engine);
        // Inside the poll interval: no bus traffic, so no interrupt clear
        assert_eq!(engine.tick(Instant::from_millis(2), &sink), None);
        assert_eq!(reads(&mut engine), before);
        assert_eq!(engine.tick(Instant::from_millis(5), &sink), Some(0));
        assert!(reads(&mut engine) > before);
        assert!(engine.channel(pos('A')).current);
    }

    #[test]
    fn test_sample_ignores_poll_interval() {
        let mut engine = engine(&[pos('A')]);
        let sink = Collected::default();
        engine.sample(Instant::from_millis(0), &sink);
        engine.bus_mut().set_touched(pos('A'), true);
        engine.sample(Instant::from_millis(1), &sink);
        assert!(engine.channel(pos('A')).current);
        assert_eq!(engine.tick(Instant::from_millis(3), &sink), None);
    }

    #[test]
    fn test_touched_read_clears_interrupt_bit() {
        let mut engine = engine(&[pos('A')]);
        let sink = Collected::default();
        let a = address(pos('A'));
        engine.bus_mut().registers.insert((a, 0x00), 0x01);
        engine.bus_mut().set_touched(pos('A'), true);
        engine.tick(Instant::from_millis(0), &sink);
        assert_eq!(engine.bus_mut().registers[&(a, 0x00)], 0x00);
    }

    #[test]
    fn test_set_sensitivity_preserves_other_bits() {
        let mut engine = engine(&[pos('B')]);
        let b = address(pos('B'));
        engine.bus_mut().registers.insert((b, REG_SENSITIVITY), 0x8F);
        engine
            .set_sensitivity(pos('B'), Sensitivity::new(3).unwrap())
            .unwrap();
        assert_eq!(engine.bus_mut().registers[&(b, REG_SENSITIVITY)], 0x8F | 0x30);
    }

    #[test]
    fn test_sensitivity_range() {
        assert!(Sensitivity::new(0).is_some());
        assert!(Sensitivity::new(7).is_some());
        assert!(Sensitivity::new(8).is_none());
    }

    #[test]
    fn test_inactive_channel_operations() {
        let mut engine = engine(&[pos('A')]);
        assert_eq!(engine.read_delta(pos('B')), Err(TouchError::Inactive));
        assert_eq!(engine.recalibrate(pos('B')), Err(TouchError::Inactive));
        assert_eq!(engine.bus_mut().writes_to(REG_CALIBRATE).len(), 0);
    }

    #[test]
    fn test_read_delta_is_signed() {
        let mut engine = engine(&[pos('C')]);
        engine
            .bus_mut()
            .registers
            .insert((address(pos('C')), REG_DELTA), 0xFD);
        assert_eq!(engine.read_delta(pos('C')), Ok(-3));
    }

    #[test]
    fn test_read_delta_bus_failure_is_distinct() {
        let mut engine = engine(&[pos('C')]);
        engine.bus_mut().failing.insert(address(pos('C')));
        assert_eq!(
            engine.read_delta(pos('C')),
            Err(TouchError::Bus(BusError::Transfer))
        );
    }

    #[test]
    fn test_recalibrate_all_touches_active_channels_only() {
        let mut engine = engine(&[pos('A'), pos('Y')]);
        engine.recalibrate_all().unwrap();
        let writes = engine.bus_mut().writes_to(REG_CALIBRATE);
        assert_eq!(
            writes,
            vec![
                (address(pos('A')), REG_CALIBRATE, 0x01),
                (address(pos('Y')), REG_CALIBRATE, 0x01),
            ]
        );
    }

    #[test]
    fn test_handle_reports_busy_while_locked() {
        let shared = TimedMutex::new(engine(&[pos('A')]));
        let mut handle = TouchHandle::new(&shared, Duration::from_millis(1));
        {
            let _guard = shared.try_lock().unwrap();
            assert_eq!(handle.expect_press(pos('A'), None), Err(TouchError::Busy));
        }
        assert_eq!(handle.expect_press(pos('A'), Some(CommandId(4))), Ok(()));
        assert!(shared.try_lock().unwrap().press_watch(pos('A')).is_armed());
    }

    /// Two-wire bus with one register file per device address
    #[derive(Default)]
    struct FakeI2c {
        devices: HashMap<u8, HashMap<u8, u8>>,
        arbitration_lost: bool,
    }

    impl ErrorType for FakeI2c {
        type Error = ErrorKind;
    }

    impl I2c for FakeI2c {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            if self.arbitration_lost {
                return Err(ErrorKind::ArbitrationLoss);
            }
            let registers = self
                .devices
                .get_mut(&address)
                .ok_or(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address))?;
            let mut pointer = 0;
            for operation in operations {
                match operation {
                    Operation::Write([register]) => pointer = *register,
                    Operation::Write([register, value]) => {
                        registers.insert(*register, *value);
                    }
                    Operation::Write(_) => {}
                    Operation::Read(buffer) => {
                        buffer[0] = registers.get(&pointer).copied().unwrap_or(0);
                    }
                }
            }
            Ok(())
        }
    }

    #[test]
    fn test_i2c_registers_transfers() {
        let mut i2c = FakeI2c::default();
        i2c.devices.insert(0x29, HashMap::from([(REG_PRODUCT_ID, 0x50)]));
        let mut bus = I2cRegisters(i2c);

        assert_eq!(bus.read_register(0x29, REG_PRODUCT_ID), Ok(0x50));
        assert_eq!(bus.write_register(0x29, REG_SENSITIVITY, 0x2F), Ok(()));
        assert_eq!(bus.read_register(0x29, REG_SENSITIVITY), Ok(0x2F));
    }

    #[test]
    fn test_i2c_registers_classifies_errors() {
        let mut bus = I2cRegisters(FakeI2c::default());
        assert_eq!(bus.read_register(0x29, REG_STATUS), Err(BusError::NoAcknowledge));
        assert_eq!(
            bus.write_register(0x29, REG_CALIBRATE, 0x01),
            Err(BusError::NoAcknowledge)
        );

        bus.0.devices.insert(0x29, HashMap::new());
        bus.0.arbitration_lost = true;
        assert_eq!(bus.read_register(0x29, REG_STATUS), Err(BusError::Transfer));
    }

    #[test]
    fn test_engine_probes_over_i2c() {
        let mut i2c = FakeI2c::default();
        let a = address(pos('A'));
        i2c.devices.insert(a, HashMap::from([(REG_PRODUCT_ID, 0x50)]));
        let mut engine = TouchEngine::new(I2cRegisters(i2c), TouchTimings::default());
        assert_eq!(engine.probe_all(), 1);
        assert_eq!(engine.bus_mut().0.devices[&a][&0x21], 0x01);
    }
}
