//! Per-iteration buffer isolation, checked against a stubbed device layer

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use vramwatch_gpu::{
    AllocationPolicy, ComputeDriver, DeviceBuffer, Fill, GpuResult, MatmulExecutor, MatmulShape,
};

#[derive(Default)]
struct Registry {
    next_id: u64,
    live: HashSet<u64>,
    /// Buffer ids handed to each matmul call
    used: Vec<[u64; 3]>,
}

struct StubBuffer {
    id: u64,
    rows: usize,
    cols: usize,
    data: Vec<f32>,
    registry: Rc<RefCell<Registry>>,
}

impl DeviceBuffer for StubBuffer {
    fn dims(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }
}

impl Drop for StubBuffer {
    fn drop(&mut self) {
        self.registry.borrow_mut().live.remove(&self.id);
    }
}

#[derive(Default)]
struct StubDevice {
    registry: Rc<RefCell<Registry>>,
}

impl MatmulExecutor for StubDevice {
    type Buffer = StubBuffer;

    fn name(&self) -> &'static str {
        "stub"
    }

    fn allocate(&mut self, rows: usize, cols: usize) -> GpuResult<StubBuffer> {
        let mut registry = self.registry.borrow_mut();
        registry.next_id += 1;
        let id = registry.next_id;
        registry.live.insert(id);
        Ok(StubBuffer {
            id,
            rows,
            cols,
            // Poison so a stale buffer would show up in the output
            data: vec![f32::NAN; rows * cols],
            registry: Rc::clone(&self.registry),
        })
    }

    fn fill(&mut self, buffer: &mut StubBuffer, value: f32) -> GpuResult<()> {
        buffer.data.fill(value);
        Ok(())
    }

    fn matmul(&mut self, a: &StubBuffer, b: &StubBuffer, c: &mut StubBuffer) -> GpuResult<()> {
        self.registry.borrow_mut().used.push([a.id, b.id, c.id]);
        let (m, k) = a.dims();
        let n = b.cols;
        for i in 0..m {
            for j in 0..n {
                c.data[i * n + j] = (0..k).map(|p| a.data[i * k + p] * b.data[p * n + j]).sum();
            }
        }
        Ok(())
    }

    fn read(&mut self, buffer: &StubBuffer) -> GpuResult<Vec<f32>> {
        Ok(buffer.data.clone())
    }
}

#[test]
fn test_iterations_do_not_share_buffers() {
    let device = StubDevice::default();
    let registry = Rc::clone(&device.registry);
    let shape = MatmulShape::new(3, 5, 4).unwrap();
    let mut driver = ComputeDriver::new(device, shape);

    for iteration in 1..=6u32 {
        let fill = Fill::new(iteration as f32, 10.0 * iteration as f32);
        driver.set_fill(fill);

        let outcome = driver.run_matmul().unwrap();

        let expected = 5.0 * fill.a * fill.b;
        assert!(
            outcome.output.iter().all(|&v| v == expected),
            "iteration {} saw {:?}, expected {}",
            iteration,
            outcome.output,
            expected
        );
        assert!(registry.borrow().live.is_empty());
    }

    let registry = registry.borrow();
    assert_eq!(registry.used.len(), 6);
    let all_ids: HashSet<u64> = registry.used.iter().flatten().copied().collect();
    assert_eq!(all_ids.len(), 6 * 3);
}

#[test]
fn test_hoisted_buffers_are_reused_and_released() {
    let device = StubDevice::default();
    let registry = Rc::clone(&device.registry);
    let mut driver = ComputeDriver::new(device, MatmulShape::new(2, 2, 2).unwrap())
        .with_policy(AllocationPolicy::Hoisted);

    for _ in 0..4 {
        assert!(driver.run_matmul().unwrap().is_correct());
        assert_eq!(registry.borrow().live.len(), 3);
    }

    let used = registry.borrow().used.clone();
    assert!(used.windows(2).all(|w| w[0] == w[1]));

    drop(driver);
    assert!(registry.borrow().live.is_empty());
}
