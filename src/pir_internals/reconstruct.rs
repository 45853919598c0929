use super::{branch_opt_util, error::BPIRError, matrix::Matrix};

/// Recovers the values dishonest servers should have returned, using the check matrix `B` and the target column `s` of the
/// verification table `S = B·Y`.
///
/// With `k = |dishonest|`, the first `k` rows of `B` are taken; check-matrix seeds are sorted ascending, so those are the rows
/// of smallest magnitude. Their columns are split into the `k x k` block over dishonest servers and the `k x (n-k)` block
/// over honest ones, the honest contribution is subtracted from the first `k` entries of `s`, and the remaining square
/// system is solved.
///
/// When every server is dishonest, the full system `B·x = s` is solved instead. With no dishonest server there is nothing
/// to recover.
///
/// # Arguments
///
/// * `check_mat` - `n x n` check matrix.
/// * `verification_col` - `S[·][target_index]`, of length `n`.
/// * `raw` - Raw responses of all servers, indexed by server. Entries at dishonest indices are ignored.
/// * `dishonest`, `honest` - Disjoint server index sets covering `0..n`, each in ascending order.
///
/// # Returns
///
/// Recovered values, in the order of `dishonest`.
pub fn reconstruct(check_mat: &Matrix, verification_col: &[f64], raw: &[f64], dishonest: &[usize], honest: &[usize]) -> Result<Vec<f64>, BPIRError> {
    let n = check_mat.num_rows();
    let k = dishonest.len();

    if branch_opt_util::unlikely(check_mat.num_cols() != n) {
        return Err(BPIRError::NonSquareMatrix(n, check_mat.num_cols()));
    }
    if branch_opt_util::unlikely(verification_col.len() != n) {
        return Err(BPIRError::InsufficientVerificationData);
    }
    if branch_opt_util::unlikely(raw.len() != n) {
        return Err(BPIRError::UnexpectedResponseCount(n, raw.len()));
    }
    if branch_opt_util::unlikely(k + honest.len() != n) {
        return Err(BPIRError::InvalidServerPartition);
    }

    let mut seen = vec![false; n];
    for &idx in dishonest.iter().chain(honest) {
        if branch_opt_util::unlikely(idx >= n) {
            return Err(BPIRError::InvalidServerIndex(idx));
        }
        if branch_opt_util::unlikely(seen[idx]) {
            return Err(BPIRError::InvalidServerPartition);
        }
        seen[idx] = true;
    }

    if k == 0 {
        return Ok(Vec::new());
    }
    if k == n {
        return check_mat.solve(verification_col);
    }

    let leading_rows = (0..k).collect::<Vec<usize>>();
    let b_k = check_mat.select_rows(&leading_rows)?;
    let b_unknown = b_k.select_cols(dishonest)?;
    let b_known = b_k.select_cols(honest)?;

    let known = honest.iter().map(|&idx| raw[idx]).collect::<Vec<f64>>();
    let honest_contribution = b_known.mul_vec(&known)?;

    let residual = verification_col[..k]
        .iter()
        .zip(&honest_contribution)
        .map(|(s, c)| s - c)
        .collect::<Vec<f64>>();

    b_unknown.solve(&residual)
}

#[cfg(test)]
mod test {
    use super::reconstruct;
    use crate::pir_internals::{error::BPIRError, matrix::Matrix};
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;
    use test_case::test_case;

    fn split(n: usize, dishonest_mask: u32) -> (Vec<usize>, Vec<usize>) {
        (0..n).partition(|&idx| dishonest_mask & (1 << idx) != 0)
    }

    #[test]
    fn every_dishonest_subset_is_recovered() {
        const NUM_SERVERS: usize = 5;

        let mut rng = ChaCha8Rng::from_os_rng();
        let check_mat = Matrix::sample_check_matrix(NUM_SERVERS, &mut rng).unwrap();

        let shares = (0..NUM_SERVERS).map(|_| rng.random_range(0..(1u32 << 24)) as f64).collect::<Vec<f64>>();
        let verification_col = check_mat.mul_vec(&shares).unwrap();

        for mask in 0..(1u32 << NUM_SERVERS) {
            let (dishonest, honest) = split(NUM_SERVERS, mask);

            let mut raw = shares.clone();
            dishonest.iter().for_each(|&idx| raw[idx] = -1.0);

            let recovered = reconstruct(&check_mat, &verification_col, &raw, &dishonest, &honest).unwrap();

            assert_eq!(recovered.len(), dishonest.len());
            for (&idx, value) in dishonest.iter().zip(&recovered) {
                assert!((value - shares[idx]).abs() < 1e-3, "mask = {:#b}, server = {}, expected = {}, got = {}", mask, idx, shares[idx], value);
            }
        }
    }

    #[test_case(vec![0.0; 3], vec![0.0; 3], vec![0], vec![1, 2] => Err(BPIRError::InsufficientVerificationData); "Verification column must cover all servers")]
    #[test_case(vec![0.0; 4], vec![0.0; 2], vec![0], vec![1, 2, 3] => Err(BPIRError::UnexpectedResponseCount(4, 2)); "Raw responses must cover all servers")]
    #[test_case(vec![0.0; 4], vec![0.0; 4], vec![0, 1], vec![1] => Err(BPIRError::InvalidServerPartition); "Partition must cover all servers")]
    #[test_case(vec![0.0; 4], vec![0.0; 4], vec![0, 1], vec![1, 2] => Err(BPIRError::InvalidServerPartition); "Partition must be disjoint")]
    #[test_case(vec![0.0; 4], vec![0.0; 4], vec![7], vec![1, 2, 3] => Err(BPIRError::InvalidServerIndex(7)); "Server indices must be in range")]
    fn reconstruction_preconditions(verification_col: Vec<f64>, raw: Vec<f64>, dishonest: Vec<usize>, honest: Vec<usize>) -> Result<Vec<f64>, BPIRError> {
        let check_mat = Matrix::generalized_vandermonde(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        reconstruct(&check_mat, &verification_col, &raw, &dishonest, &honest)
    }

    #[test]
    fn degenerate_check_matrix_is_reported_as_numerical_failure() {
        let check_mat = Matrix::from_values(2, 2, vec![1.0, 1.0, 1.0, 1.0]).unwrap();
        let res = reconstruct(&check_mat, &[2.0, 2.0], &[0.0, 0.0], &[0, 1], &[]);

        assert_eq!(res, Err(BPIRError::SingularLinearSystem));
    }
}
