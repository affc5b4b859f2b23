//! Symmetric quadrature rules for the unit triangle and unit tetrahedron.
//!
//! The points are fully symmetric orbits of the reference simplex. Each table lists one weight
//! per point, and all points in an orbit share the same weight. Weights sum to the reference
//! volume, 1/2 for the triangle and 1/6 for the tetrahedron.

use crate::Rule;

/// Total polynomial degree integrated exactly by each triangle rule, indexed from 1.
pub const TRIANGLE_STRENGTHS: [usize; 5] = [1, 2, 4, 5, 7];

/// Total polynomial degree integrated exactly by each tetrahedron rule, indexed from 1.
pub const TETRAHEDRON_STRENGTHS: [usize; 6] = [1, 2, 3, 5, 6, 8];

/// The triangle rule with the given index in `1..=5`.
pub fn triangle(index: usize) -> Option<Rule<2>> {
    let table = match index {
        1 => TRIANGLE_1,
        2 => TRIANGLE_2,
        3 => TRIANGLE_3,
        4 => TRIANGLE_4,
        5 => TRIANGLE_5,
        _ => return None,
    };
    Some(table.iter().map(|&(x, w)| (w, x)).unzip())
}

/// The tetrahedron rule with the given index in `1..=6`.
pub fn tetrahedron(index: usize) -> Option<Rule<3>> {
    let table = match index {
        1 => TETRAHEDRON_1,
        2 => TETRAHEDRON_2,
        3 => TETRAHEDRON_3,
        4 => TETRAHEDRON_4,
        5 => TETRAHEDRON_5,
        6 => TETRAHEDRON_6,
        _ => return None,
    };
    Some(table.iter().map(|&(x, w)| (w, x)).unzip())
}

/// 1-point rule, exact for polynomials of total degree 1.
const TRIANGLE_1: &[([f64; 2], f64)] = &[
    ([0.3333333333333333, 0.3333333333333333], 0.5),
];

/// 3-point rule, exact for polynomials of total degree 2.
const TRIANGLE_2: &[([f64; 2], f64)] = &[
    ([0.16666666666666666, 0.16666666666666666], 0.16666666666666666),
    ([0.16666666666666666, 0.6666666666666666], 0.16666666666666666),
    ([0.6666666666666666, 0.16666666666666666], 0.16666666666666666),
];

/// 6-point rule, exact for polynomials of total degree 4.
const TRIANGLE_3: &[([f64; 2], f64)] = &[
    ([0.09157621350977074, 0.09157621350977074], 0.054975871827660935),
    ([0.09157621350977074, 0.8168475729804585], 0.054975871827660935),
    ([0.8168475729804585, 0.09157621350977074], 0.054975871827660935),
    ([0.10810301816807023, 0.4459484909159649], 0.11169079483900574),
    ([0.4459484909159649, 0.10810301816807023], 0.11169079483900574),
    ([0.4459484909159649, 0.4459484909159649], 0.11169079483900574),
];

/// 10-point rule, exact for polynomials of total degree 5.
const TRIANGLE_4: &[([f64; 2], f64)] = &[
    ([0.055564052669793265, 0.055564052669793265], 0.020977756498324212),
    ([0.055564052669793265, 0.8888718946604135], 0.020977756498324212),
    ([0.8888718946604135, 0.055564052669793265], 0.020977756498324212),
    ([0.07025554051838385, 0.6342107477457234], 0.056049206035443715),
    ([0.6342107477457234, 0.07025554051838385], 0.056049206035443715),
    ([0.6342107477457234, 0.2955337117358927], 0.056049206035443715),
    ([0.07025554051838385, 0.2955337117358927], 0.056049206035443715),
    ([0.2955337117358927, 0.07025554051838385], 0.056049206035443715),
    ([0.2955337117358927, 0.6342107477457234], 0.056049206035443715),
    ([0.3333333333333333, 0.3333333333333333], 0.10077149429236508),
];

/// 15-point rule, exact for polynomials of total degree 7.
const TRIANGLE_5: &[([f64; 2], f64)] = &[
    ([0.03587087769575602, 0.03587087769575602], 0.00895772750615859),
    ([0.03587087769575602, 0.9282582446084879], 0.00895772750615859),
    ([0.9282582446084879, 0.03587087769575602], 0.00895772750615859),
    ([0.24172939576796423, 0.24172939576796423], 0.06385609794063508),
    ([0.24172939576796423, 0.5165412084640716], 0.06385609794063508),
    ([0.5165412084640716, 0.24172939576796423], 0.06385609794063508),
    ([0.05138242444584005, 0.47430878777707997], 0.03810303119276207),
    ([0.47430878777707997, 0.05138242444584005], 0.03810303119276207),
    ([0.47430878777707997, 0.47430878777707997], 0.03810303119276207),
    ([0.04731248701171603, 0.7511836311064564], 0.02787490501355546),
    ([0.7511836311064564, 0.04731248701171603], 0.02787490501355546),
    ([0.7511836311064564, 0.20150388188182758], 0.02787490501355546),
    ([0.04731248701171603, 0.20150388188182758], 0.02787490501355546),
    ([0.20150388188182758, 0.04731248701171603], 0.02787490501355546),
    ([0.20150388188182758, 0.7511836311064564], 0.02787490501355546),
];

/// 1-point rule, exact for polynomials of total degree 1.
const TETRAHEDRON_1: &[([f64; 3], f64)] = &[
    ([0.25, 0.25, 0.25], 0.16666666666666666),
];

/// 4-point rule, exact for polynomials of total degree 2.
const TETRAHEDRON_2: &[([f64; 3], f64)] = &[
    ([0.5854101966249684, 0.1381966011250105, 0.1381966011250105], 0.041666666666666664),
    ([0.1381966011250105, 0.5854101966249684, 0.1381966011250105], 0.041666666666666664),
    ([0.1381966011250105, 0.1381966011250105, 0.5854101966249684], 0.041666666666666664),
    ([0.1381966011250105, 0.1381966011250105, 0.1381966011250105], 0.041666666666666664),
];

/// 10-point rule, exact for polynomials of total degree 3.
const TETRAHEDRON_3: &[([f64; 3], f64)] = &[
    ([0.7784952948213303, 0.07383490172622323, 0.07383490172622323], 0.00793885580720146),
    ([0.07383490172622323, 0.7784952948213303, 0.07383490172622323], 0.00793885580720146),
    ([0.07383490172622323, 0.07383490172622323, 0.7784952948213303], 0.00793885580720146),
    ([0.07383490172622323, 0.07383490172622323, 0.07383490172622323], 0.00793885580720146),
    ([0.4062443438840509, 0.4062443438840509, 0.0937556561159491], 0.022485207239643472),
    ([0.4062443438840509, 0.0937556561159491, 0.4062443438840509], 0.022485207239643472),
    ([0.4062443438840509, 0.0937556561159491, 0.0937556561159491], 0.022485207239643472),
    ([0.0937556561159491, 0.4062443438840509, 0.4062443438840509], 0.022485207239643472),
    ([0.0937556561159491, 0.4062443438840509, 0.0937556561159491], 0.022485207239643472),
    ([0.0937556561159491, 0.0937556561159491, 0.4062443438840509], 0.022485207239643472),
];

/// 20-point rule, exact for polynomials of total degree 5.
const TETRAHEDRON_4: &[([f64; 3], f64)] = &[
    ([0.9029422158182686, 0.0323525947272438, 0.0323525947272438], 0.0011778457990782407),
    ([0.0323525947272438, 0.9029422158182686, 0.0323525947272438], 0.0011778457990782407),
    ([0.0323525947272438, 0.0323525947272438, 0.9029422158182686], 0.0011778457990782407),
    ([0.0323525947272438, 0.0323525947272438, 0.0323525947272438], 0.0011778457990782407),
    ([0.2626825838877794, 0.6165965330619366, 0.06036044152514203], 0.007833111495314604),
    ([0.6165965330619366, 0.2626825838877794, 0.06036044152514203], 0.007833111495314604),
    ([0.2626825838877794, 0.06036044152514203, 0.6165965330619366], 0.007833111495314604),
    ([0.6165965330619366, 0.06036044152514203, 0.2626825838877794], 0.007833111495314604),
    ([0.2626825838877794, 0.06036044152514203, 0.06036044152514203], 0.007833111495314604),
    ([0.6165965330619366, 0.06036044152514203, 0.06036044152514203], 0.007833111495314604),
    ([0.06036044152514203, 0.2626825838877794, 0.6165965330619366], 0.007833111495314604),
    ([0.06036044152514203, 0.6165965330619366, 0.2626825838877794], 0.007833111495314604),
    ([0.06036044152514203, 0.2626825838877794, 0.06036044152514203], 0.007833111495314604),
    ([0.06036044152514203, 0.6165965330619366, 0.06036044152514203], 0.007833111495314604),
    ([0.06036044152514203, 0.06036044152514203, 0.2626825838877794], 0.007833111495314604),
    ([0.06036044152514203, 0.06036044152514203, 0.6165965330619366], 0.007833111495314604),
    ([0.3097693042728624, 0.3097693042728624, 0.3097693042728624], 0.016989486381644613),
    ([0.3097693042728624, 0.3097693042728624, 0.07069208718141282], 0.016989486381644613),
    ([0.3097693042728624, 0.07069208718141282, 0.3097693042728624], 0.016989486381644613),
    ([0.07069208718141282, 0.3097693042728624, 0.3097693042728624], 0.016989486381644613),
];

/// 35-point rule, exact for polynomials of total degree 6.
const TETRAHEDRON_5: &[([f64; 3], f64)] = &[
    ([0.9197896733397893, 0.026736775553403556, 0.026736775553403556], 0.0003650077327689971),
    ([0.026736775553403556, 0.9197896733397893, 0.026736775553403556], 0.0003650077327689971),
    ([0.026736775553403556, 0.026736775553403556, 0.9197896733397893], 0.0003650077327689971),
    ([0.026736775553403556, 0.026736775553403556, 0.026736775553403556], 0.0003650077327689971),
    ([0.17403563024884358, 0.747759888478222, 0.03910224063646724], 0.002389927836360534),
    ([0.747759888478222, 0.17403563024884358, 0.03910224063646724], 0.002389927836360534),
    ([0.17403563024884358, 0.03910224063646724, 0.747759888478222], 0.002389927836360534),
    ([0.747759888478222, 0.03910224063646724, 0.17403563024884358], 0.002389927836360534),
    ([0.17403563024884358, 0.03910224063646724, 0.03910224063646724], 0.002389927836360534),
    ([0.747759888478222, 0.03910224063646724, 0.03910224063646724], 0.002389927836360534),
    ([0.03910224063646724, 0.17403563024884358, 0.747759888478222], 0.002389927836360534),
    ([0.03910224063646724, 0.747759888478222, 0.17403563024884358], 0.002389927836360534),
    ([0.03910224063646724, 0.17403563024884358, 0.03910224063646724], 0.002389927836360534),
    ([0.03910224063646724, 0.747759888478222, 0.03910224063646724], 0.002389927836360534),
    ([0.03910224063646724, 0.03910224063646724, 0.17403563024884358], 0.002389927836360534),
    ([0.03910224063646724, 0.03910224063646724, 0.747759888478222], 0.002389927836360534),
    ([0.45475459998421414, 0.45475459998421414, 0.04524540001578586], 0.0041717565947735095),
    ([0.45475459998421414, 0.04524540001578586, 0.45475459998421414], 0.0041717565947735095),
    ([0.45475459998421414, 0.04524540001578586, 0.04524540001578586], 0.0041717565947735095),
    ([0.04524540001578586, 0.45475459998421414, 0.45475459998421414], 0.0041717565947735095),
    ([0.04524540001578586, 0.45475459998421414, 0.04524540001578586], 0.0041717565947735095),
    ([0.04524540001578586, 0.04524540001578586, 0.45475459998421414], 0.0041717565947735095),
    ([0.5031186450131099, 0.22320103796299767, 0.22320103796299767], 0.00799732221756424),
    ([0.22320103796299767, 0.5031186450131099, 0.22320103796299767], 0.00799732221756424),
    ([0.22320103796299767, 0.22320103796299767, 0.5031186450131099], 0.00799732221756424),
    ([0.5031186450131099, 0.22320103796299767, 0.050479279060894805], 0.00799732221756424),
    ([0.22320103796299767, 0.5031186450131099, 0.050479279060894805], 0.00799732221756424),
    ([0.22320103796299767, 0.22320103796299767, 0.050479279060894805], 0.00799732221756424),
    ([0.5031186450131099, 0.050479279060894805, 0.22320103796299767], 0.00799732221756424),
    ([0.22320103796299767, 0.050479279060894805, 0.5031186450131099], 0.00799732221756424),
    ([0.22320103796299767, 0.050479279060894805, 0.22320103796299767], 0.00799732221756424),
    ([0.050479279060894805, 0.5031186450131099, 0.22320103796299767], 0.00799732221756424),
    ([0.050479279060894805, 0.22320103796299767, 0.5031186450131099], 0.00799732221756424),
    ([0.050479279060894805, 0.22320103796299767, 0.22320103796299767], 0.00799732221756424),
    ([0.25, 0.25, 0.25], 0.015529095519852324),
];

/// 56-point rule, exact for polynomials of total degree 8.
const TETRAHEDRON_6: &[([f64; 3], f64)] = &[
    ([0.955143804540816, 0.01495206515306131, 0.01495206515306131], 0.0001728852056023422),
    ([0.01495206515306131, 0.955143804540816, 0.01495206515306131], 0.0001728852056023422),
    ([0.01495206515306131, 0.01495206515306131, 0.955143804540816], 0.0001728852056023422),
    ([0.01495206515306131, 0.01495206515306131, 0.01495206515306131], 0.0001728852056023422),
    ([0.7799760084415414, 0.15183194916593698, 0.03409602119626085], 0.0016002774233246217),
    ([0.15183194916593698, 0.7799760084415414, 0.03409602119626085], 0.0016002774233246217),
    ([0.7799760084415414, 0.03409602119626085, 0.15183194916593698], 0.0016002774233246217),
    ([0.15183194916593698, 0.03409602119626085, 0.7799760084415414], 0.0016002774233246217),
    ([0.7799760084415414, 0.03409602119626085, 0.03409602119626085], 0.0016002774233246217),
    ([0.15183194916593698, 0.03409602119626085, 0.03409602119626085], 0.0016002774233246217),
    ([0.03409602119626085, 0.7799760084415414, 0.15183194916593698], 0.0016002774233246217),
    ([0.03409602119626085, 0.15183194916593698, 0.7799760084415414], 0.0016002774233246217),
    ([0.03409602119626085, 0.7799760084415414, 0.03409602119626085], 0.0016002774233246217),
    ([0.03409602119626085, 0.15183194916593698, 0.03409602119626085], 0.0016002774233246217),
    ([0.03409602119626085, 0.03409602119626085, 0.7799760084415414], 0.0016002774233246217),
    ([0.03409602119626085, 0.03409602119626085, 0.15183194916593698], 0.0016002774233246217),
    ([0.3549340560639797, 0.5526556431060161, 0.04620515041500211], 0.00274156627997056),
    ([0.5526556431060161, 0.3549340560639797, 0.04620515041500211], 0.00274156627997056),
    ([0.3549340560639797, 0.04620515041500211, 0.5526556431060161], 0.00274156627997056),
    ([0.5526556431060161, 0.04620515041500211, 0.3549340560639797], 0.00274156627997056),
    ([0.3549340560639797, 0.04620515041500211, 0.04620515041500211], 0.00274156627997056),
    ([0.5526556431060161, 0.04620515041500211, 0.04620515041500211], 0.00274156627997056),
    ([0.04620515041500211, 0.3549340560639797, 0.5526556431060161], 0.00274156627997056),
    ([0.04620515041500211, 0.5526556431060161, 0.3549340560639797], 0.00274156627997056),
    ([0.04620515041500211, 0.3549340560639797, 0.04620515041500211], 0.00274156627997056),
    ([0.04620515041500211, 0.5526556431060161, 0.04620515041500211], 0.00274156627997056),
    ([0.04620515041500211, 0.04620515041500211, 0.3549340560639797], 0.00274156627997056),
    ([0.04620515041500211, 0.04620515041500211, 0.5526556431060161], 0.00274156627997056),
    ([0.5381043228880013, 0.22819046106876018, 0.22819046106876018], 0.002562462775221899),
    ([0.22819046106876018, 0.5381043228880013, 0.22819046106876018], 0.002562462775221899),
    ([0.22819046106876018, 0.22819046106876018, 0.5381043228880013], 0.002562462775221899),
    ([0.5381043228880013, 0.22819046106876018, 0.005514754974478441], 0.002562462775221899),
    ([0.22819046106876018, 0.5381043228880013, 0.005514754974478441], 0.002562462775221899),
    ([0.22819046106876018, 0.22819046106876018, 0.005514754974478441], 0.002562462775221899),
    ([0.5381043228880013, 0.005514754974478441, 0.22819046106876018], 0.002562462775221899),
    ([0.22819046106876018, 0.005514754974478441, 0.5381043228880013], 0.002562462775221899),
    ([0.22819046106876018, 0.005514754974478441, 0.22819046106876018], 0.002562462775221899),
    ([0.005514754974478441, 0.5381043228880013, 0.22819046106876018], 0.002562462775221899),
    ([0.005514754974478441, 0.22819046106876018, 0.5381043228880013], 0.002562462775221899),
    ([0.005514754974478441, 0.22819046106876018, 0.22819046106876018], 0.002562462775221899),
    ([0.19618375957456172, 0.3523052600879923, 0.3523052600879923], 0.004892001972920433),
    ([0.3523052600879923, 0.19618375957456172, 0.3523052600879923], 0.004892001972920433),
    ([0.3523052600879923, 0.3523052600879923, 0.19618375957456172], 0.004892001972920433),
    ([0.19618375957456172, 0.3523052600879923, 0.09920572024945373], 0.004892001972920433),
    ([0.3523052600879923, 0.19618375957456172, 0.09920572024945373], 0.004892001972920433),
    ([0.3523052600879923, 0.3523052600879923, 0.09920572024945373], 0.004892001972920433),
    ([0.19618375957456172, 0.09920572024945373, 0.3523052600879923], 0.004892001972920433),
    ([0.3523052600879923, 0.09920572024945373, 0.19618375957456172], 0.004892001972920433),
    ([0.3523052600879923, 0.09920572024945373, 0.3523052600879923], 0.004892001972920433),
    ([0.09920572024945373, 0.19618375957456172, 0.3523052600879923], 0.004892001972920433),
    ([0.09920572024945373, 0.3523052600879923, 0.19618375957456172], 0.004892001972920433),
    ([0.09920572024945373, 0.3523052600879923, 0.3523052600879923], 0.004892001972920433),
    ([0.5965649956210198, 0.1344783347929934, 0.1344783347929934], 0.006104856106751786),
    ([0.1344783347929934, 0.5965649956210198, 0.1344783347929934], 0.006104856106751786),
    ([0.1344783347929934, 0.1344783347929934, 0.5965649956210198], 0.006104856106751786),
    ([0.1344783347929934, 0.1344783347929934, 0.1344783347929934], 0.006104856106751786),
];
