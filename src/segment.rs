// Aggregate holds everything the range queries need for one contiguous block of slots.
// An empty block carries the sentinels: -inf/+inf extremes, no indices, zero sum and count.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aggregate {
    pub max_value: f64,
    pub max_index: Option<usize>,
    pub min_value: f64,
    pub min_index: Option<usize>,
    pub sum: f64,
    pub count: usize,
}

impl Aggregate {
    fn new(index: usize, value: f64) -> Self {
        Aggregate {
            max_value: value,
            max_index: Some(index),
            min_value: value,
            min_index: Some(index),
            sum: value,
            count: 1,
        }
    }

    pub fn empty() -> Self {
        Aggregate {
            max_value: f64::NEG_INFINITY,
            max_index: None,
            min_value: f64::INFINITY,
            min_index: None,
            sum: 0.0,
            count: 0,
        }
    }

    fn from_slot(index: usize, slot: Option<f64>) -> Self {
        match slot {
            Some(value) => Aggregate::new(index, value),
            None => Aggregate::empty(),
        }
    }

    /// Combines two adjacent blocks, `left` covering the lower indices.
    ///
    /// Ties on either extreme resolve to `left`, so the reported index is
    /// always the lowest one attaining the value.
    pub fn merge(left: &Aggregate, right: &Aggregate) -> Self {
        let (max_value, max_index) = if left.max_value >= right.max_value {
            (left.max_value, left.max_index)
        } else {
            (right.max_value, right.max_index)
        };
        let (min_value, min_index) = if left.min_value <= right.min_value {
            (left.min_value, left.min_index)
        } else {
            (right.min_value, right.min_index)
        };
        Aggregate {
            max_value,
            max_index,
            min_value,
            min_index,
            sum: left.sum + right.sum,
            count: left.count + right.count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    // Sentinels must never move, otherwise an empty block would start winning comparisons.
    fn shift(&mut self, delta: f64) {
        if self.count == 0 {
            return;
        }
        self.max_value += delta;
        self.min_value += delta;
        self.sum += delta * self.count as f64;
    }
}

/// Segment tree over a fixed number of optional readings, with lazy range addition.
///
/// Nodes live in a flat array with the children of `i` at `2i + 1` and `2i + 2`.
/// `lazy[i]` is a delta that has been applied neither to `tree[i]` nor to anything below it.
/// The leaves are the backing slots: [`RangeAggregateTree::get`] and
/// [`RangeAggregateTree::values`] read through them, pending deltas included.
#[derive(Clone, Debug)]
pub struct RangeAggregateTree {
    tree: Vec<Aggregate>,
    lazy: Vec<f64>,
    len: usize,
}

impl RangeAggregateTree {
    pub fn build(values: &[Option<f64>]) -> Self {
        let len = values.len();
        let mut tree = RangeAggregateTree {
            tree: vec![Aggregate::empty(); 4 * len],
            lazy: vec![0.0; 4 * len],
            len,
        };
        if len > 0 {
            tree.build_internal(0, 0, len - 1, values);
        }
        tree
    }

    fn build_internal(&mut self, node: usize, start: usize, end: usize, values: &[Option<f64>]) {
        if start == end {
            self.tree[node] = Aggregate::from_slot(start, values[start]);
            return;
        }
        let mid = (start + end) / 2;
        self.build_internal(node * 2 + 1, start, mid, values);
        self.build_internal(node * 2 + 2, mid + 1, end, values);
        self.pull(node);
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn pull(&mut self, node: usize) {
        self.tree[node] = Aggregate::merge(&self.tree[node * 2 + 1], &self.tree[node * 2 + 2]);
    }

    // Updates the node's own aggregate and stages the delta on both children,
    // whether or not the node currently holds any readings.
    fn apply_lazy(&mut self, node: usize, start: usize, end: usize, delta: f64) {
        self.tree[node].shift(delta);
        if start != end {
            self.lazy[node * 2 + 1] += delta;
            self.lazy[node * 2 + 2] += delta;
        }
    }

    fn push(&mut self, node: usize, start: usize, end: usize) {
        let pending = self.lazy[node];
        if pending != 0.0 {
            self.lazy[node] = 0.0;
            self.apply_lazy(node, start, end, pending);
        }
    }

    /// Aggregate over the present slots in `[l, r]`. An inverted range yields the empty aggregate.
    pub fn query(&mut self, l: usize, r: usize) -> Aggregate {
        if l > r || self.len == 0 {
            return Aggregate::empty();
        }
        self.query_internal(0, 0, self.len - 1, l, r)
    }

    fn query_internal(
        &mut self,
        node: usize,
        start: usize,
        end: usize,
        l: usize,
        r: usize,
    ) -> Aggregate {
        self.push(node, start, end);

        if start > r || end < l {
            return Aggregate::empty();
        }
        if l <= start && end <= r {
            return self.tree[node];
        }

        let mid = (start + end) / 2;
        let left_result = self.query_internal(node * 2 + 1, start, mid, l, r);
        let right_result = self.query_internal(node * 2 + 2, mid + 1, end, l, r);

        Aggregate::merge(&left_result, &right_result)
    }

    /// Adds `delta` to every slot in `[l, r]` that currently holds a reading.
    pub fn update_range_add(&mut self, l: usize, r: usize, delta: f64) {
        if l > r || self.len == 0 {
            return;
        }
        self.update_range_internal(0, 0, self.len - 1, l, r, delta);
    }

    fn update_range_internal(
        &mut self,
        node: usize,
        start: usize,
        end: usize,
        l: usize,
        r: usize,
        delta: f64,
    ) {
        self.push(node, start, end);

        if start > r || end < l {
            return;
        }
        if l <= start && end <= r {
            self.apply_lazy(node, start, end, delta);
            return;
        }

        let mid = (start + end) / 2;
        self.update_range_internal(node * 2 + 1, start, mid, l, r, delta);
        self.update_range_internal(node * 2 + 2, mid + 1, end, l, r, delta);
        self.pull(node);
    }

    /// Writes `value` into slot `idx`; `None` soft-deletes it. Out-of-range indices are ignored.
    ///
    /// Deltas staged by earlier range additions are settled along the path before the
    /// leaf is written, so a freshly written value never absorbs them.
    pub fn update_point(&mut self, idx: usize, value: Option<f64>) {
        if idx >= self.len {
            return;
        }
        self.update_point_internal(0, 0, self.len - 1, idx, value);
    }

    fn update_point_internal(
        &mut self,
        node: usize,
        start: usize,
        end: usize,
        idx: usize,
        value: Option<f64>,
    ) {
        self.push(node, start, end);

        if start == end {
            self.tree[node] = Aggregate::from_slot(idx, value);
            return;
        }

        let mid = (start + end) / 2;
        // The sibling off the path is merged below, so its pending delta has to land first.
        self.push(node * 2 + 1, start, mid);
        self.push(node * 2 + 2, mid + 1, end);
        if idx <= mid {
            self.update_point_internal(node * 2 + 1, start, mid, idx, value);
        } else {
            self.update_point_internal(node * 2 + 2, mid + 1, end, idx, value);
        }
        self.pull(node);
    }

    /// Current reading at `idx`, or `None` if the slot is absent or out of range.
    pub fn get(&self, idx: usize) -> Option<f64> {
        if idx >= self.len {
            return None;
        }
        let (mut node, mut start, mut end) = (0, 0, self.len - 1);
        let mut pending = 0.0;
        loop {
            pending += self.lazy[node];
            if start == end {
                let leaf = &self.tree[node];
                return (!leaf.is_empty()).then(|| leaf.max_value + pending);
            }
            let mid = (start + end) / 2;
            if idx <= mid {
                node = node * 2 + 1;
                end = mid;
            } else {
                node = node * 2 + 2;
                start = mid + 1;
            }
        }
    }

    /// Snapshot of every slot in index order.
    pub fn values(&self) -> Vec<Option<f64>> {
        let mut out = Vec::with_capacity(self.len);
        if self.len > 0 {
            self.collect_values(0, 0, self.len - 1, 0.0, &mut out);
        }
        out
    }

    fn collect_values(
        &self,
        node: usize,
        start: usize,
        end: usize,
        pending: f64,
        out: &mut Vec<Option<f64>>,
    ) {
        let pending = pending + self.lazy[node];
        if start == end {
            let leaf = &self.tree[node];
            out.push((!leaf.is_empty()).then(|| leaf.max_value + pending));
            return;
        }
        let mid = (start + end) / 2;
        self.collect_values(node * 2 + 1, start, mid, pending, out);
        self.collect_values(node * 2 + 2, mid + 1, end, pending, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPSILON: f64 = 1e-10;

    fn assert_float_eq(a: f64, b: f64) {
        if a.is_infinite() && b.is_infinite() {
            assert_eq!(a.is_sign_positive(), b.is_sign_positive());
        } else {
            assert!((a - b).abs() < EPSILON, "Expected {} but got {}", b, a);
        }
    }

    fn present(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_full_walkthrough() {
        let mut tree = RangeAggregateTree::build(&present(&[10.0, 20.0, 5.0, 30.0, 15.0]));

        let result = tree.query(0, 4);
        assert_float_eq(result.max_value, 30.0);
        assert_eq!(result.max_index, Some(3));
        assert_float_eq(result.min_value, 5.0);
        assert_eq!(result.min_index, Some(2));
        assert_float_eq(result.sum, 80.0);
        assert_eq!(result.count, 5);

        tree.update_range_add(1, 3, 10.0);
        assert_eq!(tree.values(), present(&[10.0, 30.0, 15.0, 40.0, 15.0]));
        let result = tree.query(1, 3);
        assert_float_eq(result.max_value, 40.0);
        assert_eq!(result.max_index, Some(3));
        assert_float_eq(result.min_value, 15.0);
        assert_eq!(result.min_index, Some(2));
        assert_float_eq(result.sum, 85.0);
        assert_eq!(result.count, 3);

        tree.update_point(2, None);
        assert_eq!(tree.query(0, 4).count, 4);
        let result = tree.query(1, 3);
        assert_eq!(result.count, 2);
        assert_float_eq(result.min_value, 30.0);
        assert_eq!(result.min_index, Some(1));
        assert_float_eq(result.sum, 70.0);
        assert_eq!(tree.get(2), None);
    }

    #[test]
    fn test_empty_tree() {
        let mut tree = RangeAggregateTree::build(&[]);
        assert!(tree.is_empty());
        assert_eq!(tree.query(0, 0), Aggregate::empty());
        assert_eq!(tree.query(0, 10), Aggregate::empty());

        tree.update_range_add(0, 3, 5.0);
        tree.update_point(0, Some(1.0));
        assert_eq!(tree.query(0, 0), Aggregate::empty());
        assert!(tree.values().is_empty());
        assert_eq!(tree.get(0), None);
    }

    #[test]
    fn test_inverted_range() {
        let mut tree = RangeAggregateTree::build(&present(&[1.0, 2.0, 3.0]));
        assert_eq!(tree.query(2, 1), Aggregate::empty());

        tree.update_range_add(2, 0, 100.0);
        assert_eq!(tree.values(), present(&[1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_infinity_handling() {
        let mut tree = RangeAggregateTree::build(&[None, None, Some(3.0), None]);

        let result = tree.query(0, 1);
        assert!(result.min_value.is_infinite() && result.min_value.is_sign_positive());
        assert!(result.max_value.is_infinite() && result.max_value.is_sign_negative());
        assert_eq!(result.max_index, None);
        assert_eq!(result.min_index, None);
        assert_eq!(result.count, 0);

        // Adding to an empty range must leave the sentinels alone.
        tree.update_range_add(0, 1, 7.0);
        let result = tree.query(0, 1);
        assert_eq!(result, Aggregate::empty());

        let result = tree.query(0, 3);
        assert_float_eq(result.max_value, 3.0);
        assert_eq!(result.max_index, Some(2));
        assert_eq!(result.count, 1);
    }

    #[test]
    fn test_ties_pick_lowest_index() {
        let mut tree = RangeAggregateTree::build(&present(&[4.0, 9.0, 1.0, 9.0, 1.0, 4.0]));
        let result = tree.query(0, 5);
        assert_eq!(result.max_index, Some(1));
        assert_eq!(result.min_index, Some(2));

        let result = tree.query(3, 5);
        assert_eq!(result.max_index, Some(3));
        assert_eq!(result.min_index, Some(4));

        // Raising day 0 to the shared maximum makes it the leftmost winner.
        tree.update_range_add(0, 0, 5.0);
        assert_eq!(tree.query(0, 5).max_index, Some(0));
    }

    #[test]
    fn test_range_add_outside_untouched() {
        let mut tree = RangeAggregateTree::build(&present(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]));
        tree.update_range_add(2, 4, -2.5);

        assert_float_eq(tree.query(0, 1).sum, 3.0);
        assert_float_eq(tree.query(5, 6).sum, 13.0);
        assert_float_eq(tree.query(2, 4).sum, 12.0 - 7.5);
        assert_float_eq(tree.get(3).unwrap(), 1.5);
    }

    #[test]
    fn test_range_add_cancels() {
        let values = [Some(3.0), None, Some(-1.0), Some(8.0), None, Some(2.0)];
        let mut tree = RangeAggregateTree::build(&values);
        let mut before = Vec::new();
        for l in 0..values.len() {
            for r in l..values.len() {
                before.push(tree.query(l, r));
            }
        }

        tree.update_range_add(1, 4, 6.0);
        tree.update_range_add(1, 4, -6.0);

        let mut after = Vec::new();
        for l in 0..values.len() {
            for r in l..values.len() {
                after.push(tree.query(l, r));
            }
        }
        assert_eq!(before, after);
    }

    #[test]
    fn test_soft_delete() {
        let mut tree = RangeAggregateTree::build(&present(&[5.0, 50.0, 2.0, 7.0]));
        tree.update_point(1, None);

        let result = tree.query(0, 3);
        assert_eq!(result.count, 3);
        assert_float_eq(result.max_value, 7.0);
        assert_eq!(result.max_index, Some(3));
        assert_float_eq(result.sum, 14.0);

        tree.update_point(1, Some(1.0));
        let result = tree.query(0, 3);
        assert_eq!(result.count, 4);
        assert_float_eq(result.min_value, 1.0);
        assert_eq!(result.min_index, Some(1));
    }

    #[test]
    fn test_out_of_range_point_update_is_noop() {
        let mut tree = RangeAggregateTree::build(&present(&[1.0, 2.0]));
        let before = tree.query(0, 1);
        tree.update_point(2, Some(100.0));
        tree.update_point(usize::MAX, None);
        assert_eq!(tree.query(0, 1), before);
        assert_eq!(tree.values(), present(&[1.0, 2.0]));
    }

    #[test]
    fn test_reinsert_does_not_absorb_pending_delta() {
        let mut tree = RangeAggregateTree::build(&[Some(1.0), None, Some(3.0), Some(4.0)]);
        tree.update_range_add(0, 3, 10.0);
        tree.update_point(1, Some(20.0));

        assert_eq!(tree.get(1), Some(20.0));
        assert_eq!(
            tree.values(),
            vec![Some(11.0), Some(20.0), Some(13.0), Some(14.0)]
        );
        let result = tree.query(0, 3);
        assert_float_eq(result.sum, 58.0);
        assert_eq!(result.max_index, Some(1));
    }

    #[test]
    fn test_point_update_keeps_sibling_delta() {
        let mut tree = RangeAggregateTree::build(&present(&[1.0, 2.0, 3.0, 4.0]));
        tree.update_range_add(0, 3, 1.0);
        tree.update_point(0, Some(0.0));

        let result = tree.query(0, 3);
        assert_float_eq(result.sum, 0.0 + 3.0 + 4.0 + 5.0);
        assert_float_eq(result.max_value, 5.0);
        assert_eq!(result.max_index, Some(3));
    }

    #[test]
    fn test_get_sees_pending_deltas() {
        let mut tree = RangeAggregateTree::build(&present(&[0.0; 9]));
        tree.update_range_add(0, 8, 1.0);
        tree.update_range_add(3, 5, 2.0);
        assert_eq!(tree.get(4), Some(3.0));
        assert_eq!(tree.get(8), Some(1.0));
        assert_eq!(tree.get(9), None);
    }

    #[test]
    fn test_large_tree() {
        let values: Vec<Option<f64>> = (0..10_000).map(|x| Some(x as f64)).collect();
        let mut tree = RangeAggregateTree::build(&values);
        let result = tree.query(0, 9_999);
        assert_float_eq(result.sum, 9_999.0 * 5_000.0);
        assert_eq!(result.max_index, Some(9_999));
        assert_eq!(result.min_index, Some(0));

        tree.update_range_add(5_000, 9_999, 1.0);
        assert_float_eq(tree.query(0, 9_999).sum, 9_999.0 * 5_000.0 + 5_000.0);
    }

    fn arb_aggregate() -> impl Strategy<Value = Aggregate> {
        prop_oneof![
            Just(Aggregate::empty()),
            (prop::collection::vec(-50i32..50, 1..6), 0usize..100).prop_map(|(values, offset)| {
                values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| Aggregate::new(offset + i, *v as f64))
                    .fold(Aggregate::empty(), |acc, leaf| Aggregate::merge(&acc, &leaf))
            }),
        ]
    }

    #[derive(Clone, Debug)]
    enum Op {
        Query(usize, usize),
        Add(usize, usize, i32),
        Set(usize, Option<i32>),
    }

    fn arb_op(len: usize) -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..len, 0..len).prop_map(|(l, r)| Op::Query(l, r)),
            (0..len, 0..len, -20i32..20).prop_map(|(l, r, d)| Op::Add(l, r, d)),
            (0..len + 2, prop::option::of(-100i32..100)).prop_map(|(i, v)| Op::Set(i, v)),
        ]
    }

    fn naive(model: &[Option<f64>], l: usize, r: usize) -> Aggregate {
        let mut out = Aggregate::empty();
        if l > r {
            return out;
        }
        for (i, slot) in model.iter().enumerate().take(r + 1).skip(l) {
            if let Some(v) = *slot {
                if v > out.max_value {
                    out.max_value = v;
                    out.max_index = Some(i);
                }
                if v < out.min_value {
                    out.min_value = v;
                    out.min_index = Some(i);
                }
                out.sum += v;
                out.count += 1;
            }
        }
        out
    }

    proptest! {
        #[test]
        fn merge_is_associative(a in arb_aggregate(), b in arb_aggregate(), c in arb_aggregate()) {
            let left = Aggregate::merge(&Aggregate::merge(&a, &b), &c);
            let right = Aggregate::merge(&a, &Aggregate::merge(&b, &c));
            prop_assert_eq!(left, right);
        }

        #[test]
        fn empty_is_merge_identity(x in arb_aggregate()) {
            prop_assert_eq!(Aggregate::merge(&Aggregate::empty(), &x), x);
            prop_assert_eq!(Aggregate::merge(&x, &Aggregate::empty()), x);
        }

        #[test]
        fn matches_naive_model(
            (initial, ops) in (1usize..40).prop_flat_map(|len| (
                prop::collection::vec(prop::option::of(-100i32..100), len),
                prop::collection::vec(arb_op(len), 0..60),
            ))
        ) {
            let mut model: Vec<Option<f64>> = initial.iter().map(|v| v.map(f64::from)).collect();
            let mut tree = RangeAggregateTree::build(&model);

            for op in ops {
                match op {
                    Op::Query(l, r) => {
                        prop_assert_eq!(tree.query(l, r), naive(&model, l, r));
                    }
                    Op::Add(l, r, d) => {
                        tree.update_range_add(l, r, f64::from(d));
                        if l <= r {
                            for slot in model[l..=r].iter_mut().flatten() {
                                *slot += f64::from(d);
                            }
                        }
                    }
                    Op::Set(i, v) => {
                        tree.update_point(i, v.map(f64::from));
                        if let Some(slot) = model.get_mut(i) {
                            *slot = v.map(f64::from);
                        }
                    }
                }
                prop_assert_eq!(tree.values(), model.clone());
            }

            let last = model.len() - 1;
            prop_assert_eq!(tree.query(0, last), naive(&model, 0, last));
        }
    }
}
