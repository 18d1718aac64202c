mod trainer_tests;
